use crate::arbiter::Arbiter;
use crate::constants::{EDGE_MARGIN, MAX_FLING_VELOCITY, TOUCH_SLOP};
use crate::error::{GestureError, Result, at_least, ordered};
use crate::geometry::{Directions, Edges, Rect, Vec2};
use crate::recognizer::{GestureKind, Recognizer, RecognizerCore, State, recognizer_accessors};
use crate::sample::{TouchAction, TouchSample};
use crate::timer::TimerTag;
use crate::velocity::VelocityTracker;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PanConfig {
    pub min_touches: usize,
    pub max_touches: usize,
    pub touch_slop: f32,
    pub max_velocity: f32,
    /// Directions the pan may start in; later movement is unrestricted.
    pub directions: Directions,
    /// Edges the pan must start from. Empty for an ordinary pan.
    pub edges: Edges,
    pub edge_margin: f32,
    /// Surface the edges belong to.
    pub bounds: Rect,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            min_touches: 1,
            max_touches: usize::MAX,
            touch_slop: TOUCH_SLOP,
            max_velocity: MAX_FLING_VELOCITY,
            directions: Directions::all(),
            edges: Edges::empty(),
            edge_margin: EDGE_MARGIN,
            bounds: Rect::default(),
        }
    }
}

impl PanConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("min_touches", self.min_touches as f64, 1.0)?;
        ordered(
            "min_touches",
            self.min_touches as f64,
            "max_touches",
            self.max_touches as f64,
        )?;
        at_least("touch_slop", self.touch_slop as f64, 0.0)?;
        at_least("max_velocity", self.max_velocity as f64, 0.0)?;
        at_least("edge_margin", self.edge_margin as f64, 0.0)?;
        if self.directions.is_empty() {
            return Err(GestureError::EmptyMask("directions"));
        }
        Ok(())
    }

    pub fn is_edge_pan(&self) -> bool {
        !self.edges.is_empty()
    }
}

/// Continuous drag.
///
/// Begins once the focal point moves past the touch slop in one of the
/// allowed directions, then reports `Changed` on every move until the last
/// finger lifts. `min_touches` only gates the start. Configured with `edges`, it only begins when
/// the press started within `edge_margin` of one of them and moves inwards.
#[derive(Debug)]
pub struct PanRecognizer {
    core: RecognizerCore,
    config: PanConfig,
    touches: usize,
    /// Focal point translation is measured from. Moves whenever the finger
    /// count changes so the translation does not jump.
    anchor: Vec2,
    carried: Vec2,
    translation: Vec2,
    start_edges: Edges,
    tracker: VelocityTracker,
    velocity: Vec2,
    location: Vec2,
}

impl Default for PanRecognizer {
    fn default() -> Self {
        Self::from_valid(PanConfig::default())
    }
}

impl PanRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Pan that starts from one of `edges` of `bounds`.
    pub fn edge(edges: Edges, bounds: Rect) -> Result<Self> {
        if edges.is_empty() {
            return Err(GestureError::EmptyMask("edges"));
        }
        Self::with_config(PanConfig {
            edges,
            bounds,
            ..PanConfig::default()
        })
    }

    fn from_valid(config: PanConfig) -> Self {
        Self {
            core: RecognizerCore::new(GestureKind::Pan),
            tracker: VelocityTracker::new(config.max_velocity),
            config,
            touches: 0,
            anchor: Vec2::ZERO,
            carried: Vec2::ZERO,
            translation: Vec2::ZERO,
            start_edges: Edges::empty(),
            velocity: Vec2::ZERO,
            location: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &PanConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PanConfig) -> Result<()> {
        config.validate()?;
        if self.core.state() != State::Possible || self.touches > 0 {
            log::warn!(
                "PanRecognizer {}: config changed mid-gesture ({:?})",
                self.core.id(),
                self.core.state()
            );
        }
        self.tracker.set_max_velocity(config.max_velocity);
        self.config = config;
        Ok(())
    }

    /// Offset of the focal point since the press started.
    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    /// Rebases the translation, e.g. to zero after consuming it. Velocity
    /// history is dropped.
    pub fn set_translation(&mut self, translation: Vec2) {
        self.carried = translation;
        self.anchor = self.location;
        self.translation = translation;
        self.tracker.clear();
        self.tracker.add(self.core.now(), translation);
        self.velocity = Vec2::ZERO;
    }

    /// Pixels per second.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn location(&self) -> Vec2 {
        self.location
    }

    /// Edges the current press started near (edge pans only).
    pub fn start_edges(&self) -> Edges {
        self.start_edges
    }

    fn rebase(&mut self, focal: Vec2) {
        self.carried = self.translation;
        self.anchor = focal;
        self.location = focal;
    }

    fn allowed_start(&self) -> Directions {
        if self.config.is_edge_pan() {
            self.config.directions & self.start_edges.inward()
        } else {
            self.config.directions
        }
    }
}

impl Recognizer for PanRecognizer {
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
                self.translation = Vec2::ZERO;
                self.velocity = Vec2::ZERO;
                self.rebase(focal);
                self.tracker.clear();
                self.tracker.add(sample.event_time, Vec2::ZERO);
                if self.config.is_edge_pan() {
                    self.start_edges = self
                        .config
                        .bounds
                        .edges_near(focal, self.config.edge_margin)
                        & self.config.edges;
                    if self.start_edges.is_empty() {
                        log::trace!("PanRecognizer {}: press away from edges", self.core.id());
                        self.fail(arbiter);
                    }
                }
            }
            TouchAction::PointerDown => {
                self.touches = sample.pointer_count();
                self.rebase(focal);
                if !recognized && self.touches > self.config.max_touches {
                    self.fail(arbiter);
                }
            }
            TouchAction::Move => {
                self.translation = self.carried + (focal - self.anchor);
                self.location = focal;
                self.tracker.add(sample.event_time, self.translation);
                self.velocity = self.tracker.velocity();

                if recognized {
                    self.set_state(State::Changed, arbiter);
                    self.fire_update();
                } else if self.touches >= self.config.min_touches {
                    let slop = self.config.touch_slop;
                    if self.translation.length_squared() > slop * slop {
                        let direction = Directions::dominant(self.translation);
                        if self.allowed_start().contains(direction) {
                            self.try_recognize(State::Began, arbiter);
                        } else {
                            self.fail(arbiter);
                        }
                    }
                }
            }
            TouchAction::PointerUp => {
                self.touches = sample.remaining_count();
                self.rebase(focal);
            }
            TouchAction::Up => {
                self.touches = 0;
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
        self.touches = 0;
        self.anchor = Vec2::ZERO;
        self.carried = Vec2::ZERO;
        self.start_edges = Edges::empty();
        self.tracker.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::TouchStream;

    #[test]
    fn test_pan_begins_past_slop_and_tracks() {
        let mut pan = PanRecognizer::new();
        let mut touches = TouchStream::new();
        pan.process_sample(&touches.down(0, 100.0, 100.0, 0));
        pan.process_sample(&touches.move_to(0, 104.0, 100.0, 16));
        assert_eq!(pan.state(), State::Possible);

        pan.process_sample(&touches.move_to(0, 120.0, 100.0, 32));
        assert_eq!(pan.state(), State::Began);
        assert_eq!(pan.translation(), Vec2::new(20.0, 0.0));

        pan.process_sample(&touches.move_to(0, 140.0, 110.0, 48));
        assert_eq!(pan.state(), State::Changed);
        assert_eq!(pan.translation(), Vec2::new(40.0, 10.0));
        assert!(pan.velocity().x > 0.0);

        pan.process_sample(&touches.up(0, 60));
        assert_eq!(pan.state(), State::Ended);
    }

    #[test]
    fn test_release_before_slop_fails() {
        let mut pan = PanRecognizer::new();
        let mut touches = TouchStream::new();
        pan.process_sample(&touches.down(0, 100.0, 100.0, 0));
        pan.process_sample(&touches.up(0, 40));
        assert_eq!(pan.state(), State::Failed);
    }

    #[test]
    fn test_direction_mask() {
        let mut pan = PanRecognizer::with_config(PanConfig {
            directions: Directions::VERTICAL,
            ..PanConfig::default()
        })
        .unwrap();
        let mut touches = TouchStream::new();
        pan.process_sample(&touches.down(0, 100.0, 100.0, 0));
        pan.process_sample(&touches.move_to(0, 130.0, 102.0, 20));
        assert_eq!(pan.state(), State::Failed);
    }

    #[test]
    fn test_second_finger_does_not_jump_translation() {
        let mut pan = PanRecognizer::new();
        let mut touches = TouchStream::new();
        pan.process_sample(&touches.down(0, 0.0, 0.0, 0));
        pan.process_sample(&touches.move_to(0, 30.0, 0.0, 20));
        assert_eq!(pan.state(), State::Began);

        pan.process_sample(&touches.down(1, 100.0, 0.0, 30));
        pan.process_sample(&touches.move_all(&[(0, 40.0, 0.0), (1, 110.0, 0.0)], 40));
        assert_eq!(pan.translation(), Vec2::new(40.0, 0.0));

        pan.process_sample(&touches.up(1, 50));
        assert_eq!(pan.state(), State::Changed);
        pan.process_sample(&touches.up(0, 60));
        assert_eq!(pan.state(), State::Ended);
    }

    #[test]
    fn test_two_finger_pan_ends_when_last_finger_lifts() {
        let mut pan = PanRecognizer::with_config(PanConfig {
            min_touches: 2,
            ..PanConfig::default()
        })
        .unwrap();
        let mut touches = TouchStream::new();
        pan.process_sample(&touches.down(0, 0.0, 0.0, 0));
        pan.process_sample(&touches.move_to(0, 30.0, 0.0, 10));
        assert_eq!(pan.state(), State::Possible);

        pan.process_sample(&touches.down(1, 100.0, 0.0, 20));
        pan.process_sample(&touches.move_all(&[(0, 50.0, 0.0), (1, 120.0, 0.0)], 40));
        assert_eq!(pan.state(), State::Began);

        // Below min_touches, still tracking.
        pan.process_sample(&touches.up(1, 50));
        assert_eq!(pan.state(), State::Began);
        pan.process_sample(&touches.move_to(0, 70.0, 0.0, 60));
        assert_eq!(pan.state(), State::Changed);
        assert_eq!(pan.translation(), Vec2::new(70.0, 0.0));

        pan.process_sample(&touches.up(0, 70));
        assert_eq!(pan.state(), State::Ended);
    }

    #[test]
    fn test_edge_pan_requires_start_near_edge() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 800.0);

        let mut edge = PanRecognizer::edge(Edges::LEFT, bounds).unwrap();
        let mut touches = TouchStream::new();
        edge.process_sample(&touches.down(0, 200.0, 300.0, 0));
        assert_eq!(edge.state(), State::Failed);

        let mut edge = PanRecognizer::edge(Edges::LEFT, bounds).unwrap();
        let mut touches = TouchStream::new();
        edge.process_sample(&touches.down(0, 5.0, 300.0, 0));
        assert_eq!(edge.start_edges(), Edges::LEFT);
        edge.process_sample(&touches.move_to(0, 40.0, 305.0, 20));
        assert_eq!(edge.state(), State::Began);
        assert_eq!(edge.kind(), GestureKind::Pan);
    }

    #[test]
    fn test_edge_pan_moving_outwards_fails() {
        let mut edge =
            PanRecognizer::edge(Edges::RIGHT, Rect::new(0.0, 0.0, 400.0, 800.0)).unwrap();
        let mut touches = TouchStream::new();
        edge.process_sample(&touches.down(0, 395.0, 300.0, 0));
        edge.process_sample(&touches.move_to(0, 420.0, 300.0, 20));
        assert_eq!(edge.state(), State::Failed);
    }

    #[test]
    fn test_set_translation_rebases() {
        let mut pan = PanRecognizer::new();
        let mut touches = TouchStream::new();
        pan.process_sample(&touches.down(0, 0.0, 0.0, 0));
        pan.process_sample(&touches.move_to(0, 50.0, 0.0, 20));
        pan.set_translation(Vec2::ZERO);
        pan.process_sample(&touches.move_to(0, 60.0, 0.0, 40));
        assert_eq!(pan.translation(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_empty_masks_are_rejected() {
        assert_eq!(
            PanRecognizer::edge(Edges::empty(), Rect::default()).unwrap_err(),
            GestureError::EmptyMask("edges")
        );
        assert!(
            PanRecognizer::with_config(PanConfig {
                min_touches: 3,
                max_touches: 2,
                ..PanConfig::default()
            })
            .is_err()
        );
    }
}
