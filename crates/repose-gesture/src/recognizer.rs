//! # Recognizer state machine
//!
//! Every recognizer owns a [`RecognizerCore`] (identity, state, listeners,
//! timers, dependency link) and implements the variant hooks of
//! [`Recognizer`]. The provided trait methods are the shared machinery:
//!
//! - `set_state` is the only path that changes `state`; it notifies state
//!   listeners and the owning set every time, and always for `Changed`.
//! - `try_recognize` leaves `Possible`, consulting the delegate and the
//!   "require failure of" dependency.
//! - `fail`, `finish` and `cancel_gesture` end a gesture and post the deferred
//!   reset back to `Possible`.
//!
//! ```rust
//! use repose_gesture::*;
//!
//! let mut tap = TapRecognizer::new();
//! let mut touches = TouchStream::new();
//! tap.process_sample(&touches.down(0, 10.0, 10.0, 0));
//! tap.process_sample(&touches.up(0, 60));
//! assert_eq!(tap.state(), State::Ended);
//!
//! // The reset is delivered before the next sample (or on `advance_to`).
//! tap.advance_to(60);
//! assert_eq!(tap.state(), State::Possible);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::RecognizerKey;
use crate::arbiter::Arbiter;
use crate::sample::{Millis, TouchAction, TouchSample};
use crate::timer::{TimerQueue, TimerTag};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    Possible,
    Began,
    Changed,
    Ended,
    Failed,
    Cancelled,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Ended | State::Failed | State::Cancelled)
    }

    /// `Began`, `Changed` or `Ended`.
    pub fn is_recognized(self) -> bool {
        matches!(self, State::Began | State::Changed | State::Ended)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GestureKind {
    Tap,
    LongPress,
    Pan,
    Swipe,
    Rotate,
}

impl GestureKind {
    /// Discrete gestures go straight from `Possible` to `Ended`.
    pub fn is_discrete(self) -> bool {
        matches!(self, GestureKind::Tap | GestureKind::Swipe)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecognizerId(u64);

impl RecognizerId {
    /// Next id from the process-wide counter.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecognizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type Listener = Box<dyn FnMut(&dyn Recognizer)>;

pub struct RecognizerCore {
    id: RecognizerId,
    kind: GestureKind,
    state: State,
    enabled: bool,
    cancels_touches_in_view: bool,
    began_firing: bool,
    pub(crate) dependency: Option<RecognizerKey>,
    /// State to enter or confirm once the dependency fails.
    pub(crate) pending: Option<State>,
    pub(crate) dependents: SmallVec<[RecognizerKey; 2]>,
    pub(crate) membership: Option<RecognizerKey>,
    state_listeners: Vec<Listener>,
    action_listener: Option<Listener>,
    tag: Option<Box<dyn Any>>,
    last_sample: Option<TouchSample>,
    timers: TimerQueue,
    now: Millis,
    reset_on_release: bool,
}

impl fmt::Debug for RecognizerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognizerCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .field("dependency", &self.dependency)
            .field("pending", &self.pending)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl RecognizerCore {
    pub fn new(kind: GestureKind) -> Self {
        Self {
            id: RecognizerId::next(),
            kind,
            state: State::Possible,
            enabled: true,
            cancels_touches_in_view: true,
            began_firing: false,
            dependency: None,
            pending: None,
            dependents: SmallVec::new(),
            membership: None,
            state_listeners: Vec::new(),
            action_listener: None,
            tag: None,
            last_sample: None,
            timers: TimerQueue::new(),
            now: 0,
            reset_on_release: false,
        }
    }

    pub fn id(&self) -> RecognizerId {
        self.id
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn in_state(&self, states: &[State]) -> bool {
        states.contains(&self.state)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled recognizers still record samples but make no transitions;
    /// their pending timers, apart from the reset, are dropped as they fire.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn cancels_touches_in_view(&self) -> bool {
        self.cancels_touches_in_view
    }

    pub fn set_cancels_touches_in_view(&mut self, cancels: bool) {
        self.cancels_touches_in_view = cancels;
    }

    /// True once the action listener has been allowed to fire for the current
    /// gesture.
    pub fn has_began_firing(&self) -> bool {
        self.began_firing
    }

    pub fn dependency(&self) -> Option<RecognizerKey> {
        self.dependency
    }

    /// True while the recognizer holds back its action until its dependency
    /// fails.
    pub fn is_waiting_for_dependency(&self) -> bool {
        self.pending.is_some()
    }

    /// The state a waiting recognizer settles in once its dependency fails:
    /// `Ended` for a held discrete gesture or a finished continuous one,
    /// `Began` for a continuous gesture still tracking touches.
    pub fn pending_state(&self) -> Option<State> {
        self.pending
    }

    /// Whether the variant algorithm still sees samples. A waiting gesture
    /// only keeps tracking while it is a live continuous one.
    fn tracks_samples(&self) -> bool {
        matches!(self.pending, None | Some(State::Began))
    }

    /// Recognizers currently subscribed to this one's transitions.
    pub fn dependents(&self) -> &[RecognizerKey] {
        &self.dependents
    }

    /// Key of this recognizer inside its owning set.
    pub fn member_key(&self) -> Option<RecognizerKey> {
        self.membership
    }

    pub fn add_state_listener(&mut self, listener: impl FnMut(&dyn Recognizer) + 'static) {
        self.state_listeners.push(Box::new(listener));
    }

    pub fn clear_state_listeners(&mut self) {
        self.state_listeners.clear();
    }

    /// Listener invoked by `fire_action_event`. Replaces any previous one.
    pub fn set_action_listener(&mut self, listener: impl FnMut(&dyn Recognizer) + 'static) {
        self.action_listener = Some(Box::new(listener));
    }

    pub fn clear_action_listener(&mut self) {
        self.action_listener = None;
    }

    pub fn set_tag<T: Any>(&mut self, tag: T) {
        self.tag = Some(Box::new(tag));
    }

    pub fn tag<T: Any>(&self) -> Option<&T> {
        self.tag.as_ref()?.downcast_ref::<T>()
    }

    pub fn clear_tag(&mut self) {
        self.tag = None;
    }

    pub fn last_sample(&self) -> Option<&TouchSample> {
        self.last_sample.as_ref()
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Time of the latest sample or timer seen by this recognizer.
    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn schedule_after(&mut self, tag: TimerTag, delay: Millis) {
        self.timers.schedule_at(tag, self.now.saturating_add(delay));
    }

    pub fn schedule_at(&mut self, tag: TimerTag, due: Millis) {
        self.timers.schedule_at(tag, due);
    }

    pub fn cancel_timers(&mut self, tags: &[TimerTag]) {
        self.timers.cancel(tags);
    }

    /// Whether the last sample should be treated as consumed.
    pub fn is_handling_touch(&self) -> bool {
        self.cancels_touches_in_view && self.state.is_recognized()
    }

    fn record(&mut self, sample: &TouchSample) {
        self.last_sample = Some(sample.clone());
        self.now = self.now.max(sample.event_time);
    }

    fn describe(&self) -> String {
        format!("{:?}{}", self.kind, self.id)
    }
}

/// A gesture state machine.
///
/// Variants implement the required methods; everything else is shared.
/// Listeners receive `&dyn Recognizer` and read results after downcasting:
///
/// ```rust
/// use repose_gesture::*;
///
/// let mut swipe = SwipeRecognizer::new();
/// swipe.core_mut().set_action_listener(|r| {
///     if let Some(s) = r.downcast_ref::<SwipeRecognizer>() {
///         log::info!("swiped {:?}", s.direction());
///     }
/// });
/// ```
pub trait Recognizer: Any {
    fn core(&self) -> &RecognizerCore;
    fn core_mut(&mut self) -> &mut RecognizerCore;
    fn as_dyn(&self) -> &dyn Recognizer;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Variant algorithm, called for every sample except `Cancel` while enabled.
    fn on_sample(&mut self, sample: &TouchSample, arbiter: &mut Arbiter<'_>);

    /// Variant timers; `Reset` is handled by the base.
    fn on_timer(&mut self, tag: TimerTag, arbiter: &mut Arbiter<'_>);

    /// Clears per-gesture fields before the state returns to `Possible`.
    fn reset_gesture(&mut self);

    fn id(&self) -> RecognizerId {
        self.core().id()
    }

    fn kind(&self) -> GestureKind {
        self.core().kind()
    }

    fn state(&self) -> State {
        self.core().state()
    }

    fn in_state(&self, states: &[State]) -> bool {
        self.core().in_state(states)
    }

    /// Feeds one sample to a recognizer used outside a set. Due timers run
    /// first.
    fn process_sample(&mut self, sample: &TouchSample) -> bool {
        self.advance_to(sample.event_time);
        self.process_sample_with(sample, &mut Arbiter::detached())
    }

    /// Fires every timer due at or before `now`, for recognizers used outside
    /// a set.
    fn advance_to(&mut self, now: Millis) {
        let mut arbiter = Arbiter::detached();
        while self.fire_due_timer(now, &mut arbiter) {}
    }

    fn process_sample_with(&mut self, sample: &TouchSample, arbiter: &mut Arbiter<'_>) -> bool {
        self.core_mut().record(sample);
        if !self.core().is_enabled() {
            return false;
        }

        if sample.action == TouchAction::Cancel {
            self.cancel_gesture(arbiter);
        } else if !self.core().tracks_samples() {
            log::trace!(
                "{}: holding for dependency, {:?} ignored",
                self.core().describe(),
                sample.action
            );
        } else {
            if sample.action == TouchAction::Down && self.state().is_terminal() {
                log::debug!(
                    "{}: new touch sequence while {:?}, resetting",
                    self.core().describe(),
                    self.state()
                );
                self.reset(arbiter);
            }
            self.on_sample(sample, arbiter);
        }

        if sample.ends_sequence() && self.core().reset_on_release {
            let core = self.core_mut();
            core.reset_on_release = false;
            core.timers.cancel(&[TimerTag::Reset]);
            core.schedule_after(TimerTag::Reset, 0);
        }
        self.core().is_handling_touch()
    }

    /// Pops and handles the earliest timer due at or before `now`. Returns
    /// false when nothing was due.
    fn fire_due_timer(&mut self, now: Millis, arbiter: &mut Arbiter<'_>) -> bool {
        let Some((due, tag)) = self.core_mut().timers.pop_due(now) else {
            return false;
        };
        let core = self.core_mut();
        core.now = core.now.max(due);
        log::trace!("{}: timer {:?} fired at {}", core.describe(), tag, due);
        match tag {
            TimerTag::Reset => self.reset(arbiter),
            _ if !self.core().is_enabled() => {}
            other => self.on_timer(other, arbiter),
        }
        true
    }

    fn set_state(&mut self, state: State, arbiter: &mut Arbiter<'_>) {
        let previous = self.core().state;
        if previous == state && state != State::Changed {
            return;
        }
        self.core_mut().state = state;
        log::trace!("{}: {:?} -> {:?}", self.core().describe(), previous, state);

        let mut listeners = std::mem::take(&mut self.core_mut().state_listeners);
        let me = self.as_dyn();
        for listener in listeners.iter_mut() {
            listener(me);
        }
        self.core_mut().state_listeners = listeners;
        arbiter.notify_state(state);
    }

    fn fire_action_event(&mut self) {
        let Some(mut action) = self.core_mut().action_listener.take() else {
            return;
        };
        action(self.as_dyn());
        let core = self.core_mut();
        if core.action_listener.is_none() {
            core.action_listener = Some(action);
        }
    }

    /// Fires the action if no other firing member of the set objects.
    fn fire_if_simultaneous(&mut self, arbiter: &mut Arbiter<'_>) {
        if arbiter.should_recognize_simultaneously(self.as_dyn()) {
            self.core_mut().began_firing = true;
            self.fire_action_event();
        } else {
            log::debug!(
                "{}: simultaneous recognition refused, not firing",
                self.core().describe()
            );
        }
    }

    /// Fires an update for a gesture whose action already passed the gates.
    fn fire_update(&mut self) {
        if self.core().began_firing {
            self.fire_action_event();
        }
    }

    /// Leaves `Possible` for `target` (`Began` or `Ended`), honouring the
    /// delegate and the dependency. Returns false when the recognizer failed
    /// instead.
    fn try_recognize(&mut self, target: State, arbiter: &mut Arbiter<'_>) -> bool {
        self.core_mut()
            .timers
            .cancel(&[TimerTag::Fail, TimerTag::LongPress]);
        if !arbiter.should_begin(self.as_dyn()) {
            log::debug!("{}: delegate refused to begin", self.core().describe());
            self.fail(arbiter);
            return false;
        }

        let dependency = self
            .core()
            .dependency
            .and_then(|key| arbiter.state_of(key).map(|state| (key, state)));
        match dependency {
            Some((_, State::Began | State::Changed | State::Ended)) => {
                log::debug!(
                    "{}: dependency already recognized, failing",
                    self.core().describe()
                );
                self.fail(arbiter);
                false
            }
            Some((key, State::Possible)) => {
                // Discrete gestures hold in `Possible`; continuous ones begin
                // and keep reporting transitions without firing.
                if target != State::Ended {
                    self.set_state(target, arbiter);
                }
                arbiter.subscribe(key);
                self.core_mut().pending = Some(target);
                log::debug!(
                    "{}: waiting for dependency {:?} to fail",
                    self.core().describe(),
                    key
                );
                true
            }
            _ => {
                self.set_state(target, arbiter);
                self.fire_if_simultaneous(arbiter);
                if target == State::Ended {
                    self.post_reset();
                }
                true
            }
        }
    }

    /// Ends a continuous gesture. While waiting on a dependency the end is
    /// held until the dependency resolves.
    fn finish(&mut self, arbiter: &mut Arbiter<'_>) {
        if self.core().is_waiting_for_dependency() {
            self.core_mut().pending = Some(State::Ended);
            return;
        }
        self.set_state(State::Ended, arbiter);
        self.fire_update();
        self.post_reset();
    }

    fn fail(&mut self, arbiter: &mut Arbiter<'_>) {
        self.stop_listening(arbiter);
        self.core_mut().timers.cancel_all();
        self.set_state(State::Failed, arbiter);
        self.post_reset();
    }

    fn cancel_gesture(&mut self, arbiter: &mut Arbiter<'_>) {
        self.stop_listening(arbiter);
        self.core_mut().timers.cancel_all();
        self.set_state(State::Cancelled, arbiter);
        self.fire_update();
        self.post_reset();
    }

    /// Back to `Possible`, dropping timers and the dependency subscription.
    fn reset(&mut self, arbiter: &mut Arbiter<'_>) {
        self.stop_listening(arbiter);
        let core = self.core_mut();
        core.timers.cancel_all();
        core.began_firing = false;
        core.reset_on_release = false;
        self.reset_gesture();
        self.set_state(State::Possible, arbiter);
    }

    /// Schedules the reset now when no pointer is down, otherwise once the
    /// current touch sequence ends.
    fn post_reset(&mut self) {
        let core = self.core_mut();
        let released = core
            .last_sample
            .as_ref()
            .is_none_or(TouchSample::ends_sequence);
        if released {
            core.timers.cancel(&[TimerTag::Reset]);
            core.schedule_after(TimerTag::Reset, 0);
        } else {
            core.reset_on_release = true;
        }
    }

    fn stop_listening(&mut self, arbiter: &mut Arbiter<'_>) {
        if self.core_mut().pending.take().is_none() {
            return;
        }
        if let Some(key) = self.core().dependency {
            arbiter.unsubscribe(key);
        }
    }

    /// Reaction to a transition of the recognizer this one depends on.
    fn handle_dependency_change(&mut self, dependency_state: State, arbiter: &mut Arbiter<'_>) {
        let Some(pending) = self.core().pending else {
            return;
        };
        match dependency_state {
            State::Failed | State::Cancelled => {
                self.stop_listening(arbiter);
                log::debug!("{}: dependency failed, resuming", self.core().describe());
                if pending == State::Ended {
                    self.set_state(State::Ended, arbiter);
                    self.fire_if_simultaneous(arbiter);
                    self.post_reset();
                } else {
                    self.fire_if_simultaneous(arbiter);
                }
            }
            State::Began | State::Changed | State::Ended => {
                log::debug!(
                    "{}: dependency recognized, failing",
                    self.core().describe()
                );
                self.fail(arbiter);
            }
            State::Possible => {}
        }
    }
}

impl dyn Recognizer + '_ {
    pub fn is<T: Recognizer>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Recognizer>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Recognizer>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

macro_rules! recognizer_accessors {
    () => {
        fn core(&self) -> &$crate::recognizer::RecognizerCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut $crate::recognizer::RecognizerCore {
            &mut self.core
        }

        fn as_dyn(&self) -> &dyn $crate::recognizer::Recognizer {
            self
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}
pub(crate) use recognizer_accessors;

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::TapRecognizer;

    #[test]
    fn test_ids_are_monotonic() {
        let a = RecognizerId::next();
        let b = RecognizerId::next();
        assert!(b > a);
        assert!(TapRecognizer::new().id() > b);
    }

    #[test]
    fn test_changed_always_notifies() {
        let mut tap = TapRecognizer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tap.core_mut()
            .add_state_listener(move |r| sink.borrow_mut().push(r.state()));

        let mut arbiter = Arbiter::detached();
        tap.set_state(State::Began, &mut arbiter);
        tap.set_state(State::Changed, &mut arbiter);
        tap.set_state(State::Changed, &mut arbiter);
        tap.set_state(State::Changed, &mut arbiter);
        // Non-Changed repeats are not changes.
        tap.set_state(State::Ended, &mut arbiter);
        tap.set_state(State::Ended, &mut arbiter);

        assert_eq!(
            *seen.borrow(),
            vec![
                State::Began,
                State::Changed,
                State::Changed,
                State::Changed,
                State::Ended
            ]
        );
    }

    #[test]
    fn test_tag_roundtrip() {
        let mut tap = TapRecognizer::new();
        tap.core_mut().set_tag("double-tap-zoom");
        assert_eq!(tap.core().tag::<&str>(), Some(&"double-tap-zoom"));
        assert_eq!(tap.core().tag::<u32>(), None);
    }

    #[test]
    fn test_downcast_through_dyn() {
        let tap = TapRecognizer::new();
        let r: &dyn Recognizer = &tap;
        assert!(r.is::<TapRecognizer>());
        assert!(r.downcast_ref::<crate::SwipeRecognizer>().is_none());
        assert_eq!(r.kind(), GestureKind::Tap);
    }
}
