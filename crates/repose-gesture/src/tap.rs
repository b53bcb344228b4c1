use web_time::Duration;

use crate::arbiter::Arbiter;
use crate::constants::{self, DOUBLE_TAP_SLOP, LONG_PRESS_TIMEOUT, TAP_TIMEOUT, TOUCH_SLOP};
use crate::error::{Result, at_least};
use crate::geometry::Vec2;
use crate::recognizer::{GestureKind, Recognizer, RecognizerCore, State, recognizer_accessors};
use crate::sample::{TouchAction, TouchSample};
use crate::timer::TimerTag;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TapConfig {
    pub taps_required: u32,
    /// Exact number of fingers each tap must use.
    pub touches_required: usize,
    /// Maximum gap between releasing one tap and starting the next.
    pub tap_timeout: Duration,
    /// A press held longer than this is not a tap.
    pub long_press_timeout: Duration,
    pub touch_slop: f32,
    /// Allowed distance between the first and later taps, and the movement
    /// allowance while pressing a later tap.
    pub double_tap_slop: f32,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            taps_required: 1,
            touches_required: 1,
            tap_timeout: TAP_TIMEOUT,
            long_press_timeout: LONG_PRESS_TIMEOUT,
            touch_slop: TOUCH_SLOP,
            double_tap_slop: DOUBLE_TAP_SLOP,
        }
    }
}

impl TapConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("taps_required", self.taps_required as f64, 1.0)?;
        at_least("touches_required", self.touches_required as f64, 1.0)?;
        at_least("touch_slop", self.touch_slop as f64, 0.0)?;
        at_least("double_tap_slop", self.double_tap_slop as f64, 0.0)
    }
}

/// Discrete tap: `taps_required` taps of exactly `touches_required` fingers,
/// each released before the long-press timeout and started within the tap
/// timeout of the previous one.
#[derive(Debug)]
pub struct TapRecognizer {
    core: RecognizerCore,
    config: TapConfig,
    num_taps: u32,
    max_touches: usize,
    /// Focal point the movement allowance is measured from.
    anchor: Vec2,
    first_down: Option<Vec2>,
    location: Vec2,
}

impl Default for TapRecognizer {
    fn default() -> Self {
        Self::from_valid(TapConfig::default())
    }
}

impl TapRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: TapConfig) -> Self {
        Self {
            core: RecognizerCore::new(GestureKind::Tap),
            config,
            num_taps: 0,
            max_touches: 0,
            anchor: Vec2::ZERO,
            first_down: None,
            location: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TapConfig) -> Result<()> {
        config.validate()?;
        if self.core.state() != State::Possible || self.num_taps > 0 {
            log::warn!(
                "TapRecognizer {}: config changed mid-gesture ({:?})",
                self.core.id(),
                self.core.state()
            );
        }
        self.config = config;
        Ok(())
    }

    /// Taps completed in the current sequence.
    pub fn number_of_taps(&self) -> u32 {
        self.num_taps
    }

    /// Most fingers seen during the current tap.
    pub fn number_of_touches(&self) -> usize {
        self.max_touches
    }

    /// Where the last tap was released.
    pub fn location(&self) -> Vec2 {
        self.location
    }

    fn slop(&self) -> f32 {
        if self.num_taps > 0 {
            self.config.double_tap_slop
        } else {
            self.config.touch_slop
        }
    }
}

impl Recognizer for TapRecognizer {
    recognizer_accessors!();

    fn on_sample(&mut self, sample: &TouchSample, arbiter: &mut Arbiter<'_>) {
        if self.core.state() != State::Possible {
            return;
        }
        let focal = sample.focal_point();
        match sample.action {
            TouchAction::Down => {
                match self.first_down {
                    Some(first)
                        if first.distance_squared(focal)
                            > self.config.double_tap_slop * self.config.double_tap_slop =>
                    {
                        self.fail(arbiter);
                        return;
                    }
                    Some(_) => {}
                    None => self.first_down = Some(focal),
                }
                self.anchor = focal;
                self.max_touches = sample.pointer_count();
                self.core.cancel_timers(&[TimerTag::Fail]);
                self.core.schedule_after(
                    TimerTag::Fail,
                    constants::millis(self.config.long_press_timeout),
                );
            }
            TouchAction::PointerDown => {
                let count = sample.pointer_count();
                if count > self.config.touches_required {
                    self.fail(arbiter);
                    return;
                }
                self.max_touches = self.max_touches.max(count);
                self.anchor = focal;
            }
            TouchAction::Move => {
                let slop = self.slop();
                if self.anchor.distance_squared(focal) > slop * slop {
                    self.fail(arbiter);
                }
            }
            TouchAction::PointerUp => self.anchor = focal,
            TouchAction::Up => {
                self.core.cancel_timers(&[TimerTag::Fail]);
                if self.max_touches != self.config.touches_required {
                    self.fail(arbiter);
                    return;
                }
                self.num_taps += 1;
                self.location = focal;
                if self.num_taps >= self.config.taps_required {
                    self.try_recognize(State::Ended, arbiter);
                } else {
                    self.core
                        .schedule_after(TimerTag::Fail, constants::millis(self.config.tap_timeout));
                }
            }
            TouchAction::Cancel => {}
        }
    }

    fn on_timer(&mut self, tag: TimerTag, arbiter: &mut Arbiter<'_>) {
        if tag == TimerTag::Fail && self.core.state() == State::Possible {
            self.fail(arbiter);
        }
    }

    fn reset_gesture(&mut self) {
        self.num_taps = 0;
        self.max_touches = 0;
        self.anchor = Vec2::ZERO;
        self.first_down = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::TouchStream;

    fn double_tap() -> TapRecognizer {
        TapRecognizer::with_config(TapConfig {
            taps_required: 2,
            ..TapConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_single_tap_ends() {
        let mut tap = TapRecognizer::new();
        let mut touches = TouchStream::new();
        tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
        tap.process_sample(&touches.move_to(0, 13.0, 12.0, 30));
        tap.process_sample(&touches.up(0, 80));
        assert_eq!(tap.state(), State::Ended);
        assert_eq!(tap.number_of_taps(), 1);
        assert_eq!(tap.location(), Vec2::new(13.0, 12.0));
    }

    #[test]
    fn test_moving_beyond_slop_fails() {
        let mut tap = TapRecognizer::new();
        let mut touches = TouchStream::new();
        tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
        tap.process_sample(&touches.move_to(0, 30.0, 10.0, 30));
        assert_eq!(tap.state(), State::Failed);

        // Stays failed until the finger lifts, then resets.
        tap.process_sample(&touches.up(0, 60));
        assert_eq!(tap.state(), State::Failed);
        tap.advance_to(60);
        assert_eq!(tap.state(), State::Possible);
    }

    #[test]
    fn test_held_too_long_fails() {
        let mut tap = TapRecognizer::new();
        let mut touches = TouchStream::new();
        tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
        tap.advance_to(499);
        assert_eq!(tap.state(), State::Possible);
        tap.advance_to(500);
        assert_eq!(tap.state(), State::Failed);
    }

    #[test]
    fn test_double_tap_within_timeout() {
        let mut tap = double_tap();
        let mut touches = TouchStream::new();
        tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
        tap.process_sample(&touches.up(0, 50));
        assert_eq!(tap.state(), State::Possible);
        assert_eq!(tap.number_of_taps(), 1);

        tap.process_sample(&touches.down(0, 40.0, 30.0, 200));
        tap.process_sample(&touches.up(0, 250));
        assert_eq!(tap.state(), State::Ended);
        assert_eq!(tap.number_of_taps(), 2);
    }

    #[test]
    fn test_second_tap_too_late_fails() {
        let mut tap = double_tap();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        tap.core_mut()
            .add_state_listener(move |r| sink.borrow_mut().push(r.state()));

        let mut touches = TouchStream::new();
        tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
        tap.process_sample(&touches.up(0, 50));
        tap.advance_to(349);
        assert!(seen.borrow().is_empty());

        // The failure and the reset that follows both fall due at 350.
        tap.advance_to(350);
        assert_eq!(*seen.borrow(), vec![State::Failed, State::Possible]);
    }

    #[test]
    fn test_wrong_touch_count_fails() {
        let mut tap = TapRecognizer::new();
        let mut touches = TouchStream::new();
        tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
        tap.process_sample(&touches.down(1, 20.0, 10.0, 10));
        assert_eq!(tap.state(), State::Failed);

        let mut two = TapRecognizer::with_config(TapConfig {
            touches_required: 2,
            ..TapConfig::default()
        })
        .unwrap();
        let mut touches = TouchStream::new();
        two.process_sample(&touches.down(0, 10.0, 10.0, 0));
        two.process_sample(&touches.up(0, 40));
        assert_eq!(two.state(), State::Failed);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = TapRecognizer::with_config(TapConfig {
            taps_required: 0,
            ..TapConfig::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            crate::GestureError::TooSmall {
                field: "taps_required",
                ..
            }
        ));

        let mut tap = TapRecognizer::new();
        assert!(
            tap.set_config(TapConfig {
                touch_slop: -1.0,
                ..TapConfig::default()
            })
            .is_err()
        );
        assert_eq!(tap.config().touch_slop, TOUCH_SLOP);
    }
}
