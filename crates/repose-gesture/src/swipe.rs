use web_time::Duration;

use crate::arbiter::Arbiter;
use crate::constants::{
    self, MAX_FLING_VELOCITY, SWIPE_MAX_DURATION, SWIPE_MIN_DISTANCE, SWIPE_MIN_VELOCITY,
};
use crate::error::{GestureError, Result, at_least, ordered};
use crate::geometry::{Directions, Vec2};
use crate::recognizer::{GestureKind, Recognizer, RecognizerCore, State, recognizer_accessors};
use crate::sample::{TouchAction, TouchSample};
use crate::timer::TimerTag;
use crate::velocity::VelocityTracker;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SwipeConfig {
    pub directions: Directions,
    pub touches_required: usize,
    /// Pixels per second.
    pub min_velocity: f32,
    pub min_distance: f32,
    /// Measured from the initial down.
    pub max_duration: Duration,
    pub max_velocity: f32,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            directions: Directions::RIGHT,
            touches_required: 1,
            min_velocity: SWIPE_MIN_VELOCITY,
            min_distance: SWIPE_MIN_DISTANCE,
            max_duration: SWIPE_MAX_DURATION,
            max_velocity: MAX_FLING_VELOCITY,
        }
    }
}

impl SwipeConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("touches_required", self.touches_required as f64, 1.0)?;
        at_least("min_distance", self.min_distance as f64, 0.0)?;
        at_least("min_velocity", self.min_velocity as f64, 0.0)?;
        ordered(
            "min_velocity",
            self.min_velocity as f64,
            "max_velocity",
            self.max_velocity as f64,
        )?;
        if self.directions.is_empty() {
            return Err(GestureError::EmptyMask("directions"));
        }
        Ok(())
    }
}

/// Discrete flick: ends on the first move that covers `min_distance` at
/// `min_velocity` or more in an allowed direction, within `max_duration` of
/// the initial down.
#[derive(Debug)]
pub struct SwipeRecognizer {
    core: RecognizerCore,
    config: SwipeConfig,
    touches: usize,
    start: Vec2,
    translation: Vec2,
    tracker: VelocityTracker,
    velocity: Vec2,
    direction: Directions,
    location: Vec2,
}

impl Default for SwipeRecognizer {
    fn default() -> Self {
        Self::from_valid(SwipeConfig::default())
    }
}

impl SwipeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SwipeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Swipe in any of `directions`, other settings default.
    pub fn towards(directions: Directions) -> Result<Self> {
        Self::with_config(SwipeConfig {
            directions,
            ..SwipeConfig::default()
        })
    }

    fn from_valid(config: SwipeConfig) -> Self {
        Self {
            core: RecognizerCore::new(GestureKind::Swipe),
            tracker: VelocityTracker::new(config.max_velocity),
            config,
            touches: 0,
            start: Vec2::ZERO,
            translation: Vec2::ZERO,
            velocity: Vec2::ZERO,
            direction: Directions::empty(),
            location: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &SwipeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SwipeConfig) -> Result<()> {
        config.validate()?;
        if self.core.state() != State::Possible || self.touches > 0 {
            log::warn!(
                "SwipeRecognizer {}: config changed mid-gesture ({:?})",
                self.core.id(),
                self.core.state()
            );
        }
        self.tracker.set_max_velocity(config.max_velocity);
        self.config = config;
        Ok(())
    }

    /// Direction of the recognized swipe; empty until one is recognized.
    pub fn direction(&self) -> Directions {
        self.direction
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn location(&self) -> Vec2 {
        self.location
    }

    fn qualifies(&self) -> bool {
        let distance = self.config.min_distance;
        let speed = self.config.min_velocity;
        self.translation.length_squared() >= distance * distance
            && self.velocity.length_squared() >= speed * speed
    }
}

impl Recognizer for SwipeRecognizer {
    recognizer_accessors!();

    fn on_sample(&mut self, sample: &TouchSample, arbiter: &mut Arbiter<'_>) {
        if self.core.state() != State::Possible {
            return;
        }
        let focal = sample.focal_point();
        match sample.action {
            TouchAction::Down => {
                self.touches = sample.pointer_count();
                self.start = focal;
                self.translation = Vec2::ZERO;
                self.velocity = Vec2::ZERO;
                self.direction = Directions::empty();
                self.tracker.clear();
                self.tracker.add(sample.event_time, Vec2::ZERO);
                let deadline = sample
                    .down_time
                    .saturating_add(constants::millis(self.config.max_duration));
                self.core.cancel_timers(&[TimerTag::Fail]);
                self.core.schedule_at(TimerTag::Fail, deadline);
            }
            TouchAction::PointerDown | TouchAction::PointerUp => {
                self.touches = sample.remaining_count();
                if self.touches > self.config.touches_required {
                    self.fail(arbiter);
                    return;
                }
                // Keep the translation continuous across finger changes.
                self.start = focal - self.translation;
            }
            TouchAction::Move => {
                self.translation = focal - self.start;
                self.tracker.add(sample.event_time, self.translation);
                self.velocity = self.tracker.velocity();
                if self.touches != self.config.touches_required {
                    return;
                }
                let elapsed = sample.event_time.saturating_sub(sample.down_time);
                if elapsed > constants::millis(self.config.max_duration) {
                    self.fail(arbiter);
                    return;
                }
                if !self.qualifies() {
                    return;
                }
                let direction = Directions::dominant(self.translation);
                if self.config.directions.contains(direction) {
                    self.direction = direction;
                    self.location = focal;
                    self.try_recognize(State::Ended, arbiter);
                } else {
                    log::trace!(
                        "SwipeRecognizer {}: {:?} is not an allowed direction",
                        self.core.id(),
                        direction
                    );
                    self.fail(arbiter);
                }
            }
            TouchAction::Up => {
                self.touches = 0;
                self.fail(arbiter);
            }
            TouchAction::Cancel => {}
        }
    }

    fn on_timer(&mut self, tag: TimerTag, arbiter: &mut Arbiter<'_>) {
        if tag == TimerTag::Fail && self.core.state() == State::Possible {
            log::trace!("SwipeRecognizer {}: too slow", self.core.id());
            self.fail(arbiter);
        }
    }

    fn reset_gesture(&mut self) {
        self.touches = 0;
        self.start = Vec2::ZERO;
        self.tracker.clear();
    }
}
