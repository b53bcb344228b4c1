//! # Gesture recognition
//!
//! Repose gestures are small state machines fed from a stream of multi-touch
//! samples. Each recognizer watches the same stream and decides on its own
//! whether the touches form its gesture:
//!
//! - [`TapRecognizer`]: one or more taps with a fixed number of fingers.
//! - [`LongPressRecognizer`]: a press held in place (optionally after taps).
//! - [`PanRecognizer`]: a drag, optionally restricted to directions or to
//!   starting at a surface edge.
//! - [`SwipeRecognizer`]: a quick directional flick.
//! - [`RotateRecognizer`]: two fingers turning around each other.
//!
//! Discrete gestures go `Possible → Ended`; continuous ones go
//! `Possible → Began → Changed* → Ended`. Either can end in `Failed` or
//! `Cancelled`, and every terminal state is followed by a reset to `Possible`.
//!
//! ## Sets and arbitration
//!
//! Recognizers that share a surface live in a [`RecognizerSet`]. The set feeds
//! each sample to every member in insertion order and consults an optional
//! [`GestureDelegate`]:
//!
//! ```rust
//! use repose_gesture::*;
//!
//! let mut set = RecognizerSet::with_delegate(
//!     FnDelegate::new().simultaneous_when(|_, _| false),
//! );
//! let pan = set.add(PanRecognizer::new());
//! let swipe = set.add(SwipeRecognizer::new());
//!
//! let mut touches = TouchStream::new();
//! set.process_sample(&touches.down(0, 0.0, 0.0, 0));
//! set.process_sample(&touches.move_to(0, 120.0, 0.0, 60));
//!
//! // Both recognized the drag, but only the pan got to fire.
//! assert_eq!(set.get(pan).map(|r| r.state()), Some(State::Began));
//! assert!(set.get(pan).is_some_and(|r| r.core().has_began_firing()));
//! assert!(set.get(swipe).is_some_and(|r| !r.core().has_began_firing()));
//! ```
//!
//! ## Time
//!
//! There is no background thread. Timers (tap timeouts, long-press delays,
//! deferred resets) live in each recognizer's [`TimerQueue`] and fire from
//! `advance_to(now)`, which the set calls automatically before each sample.
//! Event loops that want timeouts to fire without further input call
//! [`RecognizerSet::advance_to`] when [`RecognizerSet::next_deadline`] passes.

mod arbiter;
pub mod constants;
pub mod error;
mod geometry;
mod long_press;
mod pan;
mod recognizer;
mod rotate;
mod sample;
mod set;
mod swipe;
mod tap;
mod timer;
mod velocity;


pub use arbiter::*;
pub use error::GestureError;
pub use geometry::*;
pub use long_press::*;
pub use pan::*;
pub use recognizer::*;
pub use rotate::*;
pub use sample::*;
pub use set::*;
pub use swipe::*;
pub use tap::*;
pub use timer::*;
pub use velocity::*;

slotmap::new_key_type! {
    /// Handle to a member of a [`RecognizerSet`].
    pub struct RecognizerKey;
}
