use web_time::Duration;

use crate::arbiter::Arbiter;
use crate::constants::{self, MIN_PRESS_DURATION, TAP_TIMEOUT, TOUCH_SLOP};
use crate::error::{Result, at_least};
use crate::geometry::Vec2;
use crate::recognizer::{GestureKind, Recognizer, RecognizerCore, State, recognizer_accessors};
use crate::sample::{TouchAction, TouchSample};
use crate::timer::TimerTag;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LongPressConfig {
    pub min_press_duration: Duration,
    pub touches_required: usize,
    /// Taps that must precede the press (tap-then-hold).
    pub taps_required: u32,
    pub allowable_movement: f32,
    /// Maximum gap between the prefix taps and the next press.
    pub tap_timeout: Duration,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            min_press_duration: MIN_PRESS_DURATION,
            touches_required: 1,
            taps_required: 0,
            allowable_movement: TOUCH_SLOP,
            tap_timeout: TAP_TIMEOUT,
        }
    }
}

impl LongPressConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("touches_required", self.touches_required as f64, 1.0)?;
        at_least("allowable_movement", self.allowable_movement as f64, 0.0)
    }
}

/// Continuous press-and-hold.
///
/// Begins once `touches_required` fingers have stayed within
/// `allowable_movement` for `min_press_duration`. Movement past the allowance
/// after that reports `Changed`; lifting the fingers ends the gesture.
#[derive(Debug)]
pub struct LongPressRecognizer {
    core: RecognizerCore,
    config: LongPressConfig,
    num_taps: u32,
    touches: usize,
    anchor: Vec2,
    moved: bool,
    location: Vec2,
}

impl Default for LongPressRecognizer {
    fn default() -> Self {
        Self::from_valid(LongPressConfig::default())
    }
}

impl LongPressRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LongPressConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: LongPressConfig) -> Self {
        Self {
            core: RecognizerCore::new(GestureKind::LongPress),
            config,
            num_taps: 0,
            touches: 0,
            anchor: Vec2::ZERO,
            moved: false,
            location: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &LongPressConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LongPressConfig) -> Result<()> {
        config.validate()?;
        if self.core.state() != State::Possible || self.touches > 0 {
            log::warn!(
                "LongPressRecognizer {}: config changed mid-gesture ({:?})",
                self.core.id(),
                self.core.state()
            );
        }
        self.config = config;
        Ok(())
    }

    /// Focal point of the press, following the fingers once it began.
    pub fn location(&self) -> Vec2 {
        self.location
    }

    fn holding(&self) -> bool {
        self.num_taps >= self.config.taps_required
    }

    fn beyond_allowance(&self, focal: Vec2) -> bool {
        let allowance = self.config.allowable_movement;
        self.anchor.distance_squared(focal) > allowance * allowance
    }
}

impl Recognizer for LongPressRecognizer {
    recognizer_accessors!();

    fn on_sample(&mut self, sample: &TouchSample, arbiter: &mut Arbiter<'_>) {
        let state = self.core.state();
        if state.is_terminal() {
            return;
        }
        let focal = sample.focal_point();
        let recognized = matches!(state, State::Began | State::Changed);

        match sample.action {
            TouchAction::Down => {
                self.touches = sample.pointer_count();
                self.anchor = focal;
                self.location = focal;
                self.core.cancel_timers(&[TimerTag::Fail]);
                if self.holding() {
                    self.core.schedule_after(
                        TimerTag::LongPress,
                        constants::millis(self.config.min_press_duration),
                    );
                } else {
                    // A prefix tap held this long is a press, not a tap.
                    self.core.schedule_after(
                        TimerTag::Fail,
                        constants::millis(self.config.min_press_duration),
                    );
                }
            }
            TouchAction::PointerDown => {
                self.touches = sample.pointer_count();
                self.anchor = focal;
                if !recognized && self.touches > self.config.touches_required {
                    self.fail(arbiter);
                }
            }
            TouchAction::Move => {
                if recognized {
                    self.location = focal;
                    if self.moved || self.beyond_allowance(focal) {
                        self.moved = true;
                        self.set_state(State::Changed, arbiter);
                        self.fire_update();
                    }
                } else if self.beyond_allowance(focal) {
                    self.fail(arbiter);
                }
            }
            TouchAction::PointerUp => {
                self.touches = sample.remaining_count();
                self.anchor = focal;
                if recognized {
                    if self.touches < self.config.touches_required {
                        self.finish(arbiter);
                    }
                } else if self.holding() {
                    self.fail(arbiter);
                }
            }
            TouchAction::Up => {
                self.touches = 0;
                if recognized {
                    self.location = focal;
                    self.finish(arbiter);
                } else if !self.holding() {
                    self.num_taps += 1;
                    self.core.cancel_timers(&[TimerTag::Fail]);
                    self.core
                        .schedule_after(TimerTag::Fail, constants::millis(self.config.tap_timeout));
                } else {
                    self.fail(arbiter);
                }
            }
            TouchAction::Cancel => {}
        }
    }

    fn on_timer(&mut self, tag: TimerTag, arbiter: &mut Arbiter<'_>) {
        if self.core.state() != State::Possible {
            return;
        }
        match tag {
            TimerTag::LongPress if self.touches == self.config.touches_required => {
                self.try_recognize(State::Began, arbiter);
            }
            TimerTag::LongPress | TimerTag::Fail => self.fail(arbiter),
            TimerTag::Reset => {}
        }
    }

    fn reset_gesture(&mut self) {
        self.num_taps = 0;
        self.touches = 0;
        self.anchor = Vec2::ZERO;
        self.moved = false;
    }
}
