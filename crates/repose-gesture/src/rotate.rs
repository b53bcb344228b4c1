use crate::arbiter::Arbiter;
use crate::constants::ROTATION_THRESHOLD;
use crate::error::{Result, at_least};
use crate::geometry::{Vec2, angle_between, normalize_degrees};
use crate::recognizer::{GestureKind, Recognizer, RecognizerCore, State, recognizer_accessors};
use crate::sample::{Millis, TouchAction, TouchSample};
use crate::timer::TimerTag;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RotateConfig {
    /// Radians of accumulated rotation before the gesture begins.
    pub rotation_threshold: f32,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            rotation_threshold: ROTATION_THRESHOLD,
        }
    }
}

impl RotateConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("rotation_threshold", self.rotation_threshold as f64, 0.0)
    }
}

/// Two-finger rotation, continuous.
#[derive(Debug)]
pub struct RotateRecognizer {
    core: RecognizerCore,
    config: RotateConfig,
    rotation: f32,
    velocity: f32,
    last_span: Option<Vec2>,
    last_time: Millis,
    location: Vec2,
}

impl Default for RotateRecognizer {
    fn default() -> Self {
        Self::from_valid(RotateConfig::default())
    }
}

impl RotateRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RotateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: RotateConfig) -> Self {
        Self {
            core: RecognizerCore::new(GestureKind::Rotate),
            config,
            rotation: 0.0,
            velocity: 0.0,
            last_span: None,
            last_time: 0,
            location: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &RotateConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RotateConfig) -> Result<()> {
        config.validate()?;
        if self.core.state() != State::Possible || self.last_span.is_some() {
            log::warn!(
                "RotateRecognizer {}: config changed mid-gesture ({:?})",
                self.core.id(),
                self.core.state()
            );
        }
        self.config = config;
        Ok(())
    }

    /// Accumulated rotation in radians, positive clockwise on screen (y down).
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Accumulated rotation in degrees, wrapped into `[-180, 180]`.
    pub fn rotation_in_degrees(&self) -> f32 {
        normalize_degrees(self.rotation.to_degrees())
    }

    /// Radians per second over the latest move.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Midpoint between the fingers.
    pub fn location(&self) -> Vec2 {
        self.location
    }

    fn rebase(&mut self, sample: &TouchSample) {
        self.last_span = sample.span_vector();
        self.last_time = sample.event_time;
        self.location = sample.focal_point();
    }
}

impl Recognizer for RotateRecognizer {
    recognizer_accessors!();

    fn on_sample(&mut self, sample: &TouchSample, arbiter: &mut Arbiter<'_>) {
        let state = self.core.state();
        if state.is_terminal() {
            return;
        }
        let recognized = matches!(state, State::Began | State::Changed);

        match sample.action {
            TouchAction::Down => {
                self.rotation = 0.0;
                self.velocity = 0.0;
                self.rebase(sample);
            }
            TouchAction::PointerDown => self.rebase(sample),
            TouchAction::Move => {
                let (Some(previous), Some(span)) = (self.last_span, sample.span_vector()) else {
                    return;
                };
                let delta = angle_between(previous, span);
                let dt = sample.event_time.saturating_sub(self.last_time);
                if dt > 0 {
                    self.velocity = delta * 1000.0 / dt as f32;
                }
                self.rotation += delta;
                self.last_span = Some(span);
                self.last_time = sample.event_time;
                self.location = sample.focal_point();

                if recognized {
                    self.set_state(State::Changed, arbiter);
                    self.fire_update();
                } else if self.rotation.abs() > self.config.rotation_threshold {
                    self.try_recognize(State::Began, arbiter);
                }
            }
            TouchAction::PointerUp => {
                if sample.remaining_count() >= 2 {
                    self.rebase(sample);
                } else if recognized {
                    self.location = sample.focal_point();
                    self.finish(arbiter);
                } else {
                    self.fail(arbiter);
                }
            }
            TouchAction::Up => {
                if recognized {
                    self.finish(arbiter);
                } else {
                    self.fail(arbiter);
                }
            }
            TouchAction::Cancel => {}
        }
    }

    fn on_timer(&mut self, _tag: TimerTag, _arbiter: &mut Arbiter<'_>) {}

    fn reset_gesture(&mut self) {
        self.last_span = None;
        self.last_time = 0;
    }
}
