//! # Recognizer sets
//!
//! A [`RecognizerSet`] owns the recognizers attached to one touch surface. Each
//! sample goes to every member in insertion order; timers due before the
//! sample fire first, so timer callbacks and touch delivery never interleave.
//!
//! After each member runs, its state changes are delivered to the members
//! waiting on it ("require failure of") before the next member sees the
//! sample. A member that is waiting is dispatched after the member it waits
//! on.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use repose_gesture::*;
//!
//! let mut set = RecognizerSet::new();
//! let double = set.add(TapRecognizer::with_config(TapConfig {
//!     taps_required: 2,
//!     ..TapConfig::default()
//! })?);
//!
//! let fired = Rc::new(Cell::new(0));
//! let counter = fired.clone();
//! let mut single_tap = TapRecognizer::new();
//! single_tap
//!     .core_mut()
//!     .set_action_listener(move |_| counter.set(counter.get() + 1));
//! let single = set.add(single_tap);
//! set.require_failure_of(single, double)?;
//!
//! let mut touches = TouchStream::new();
//! set.process_sample(&touches.down(0, 50.0, 50.0, 0));
//! set.process_sample(&touches.up(0, 80));
//! // Recognized, but held in `Possible` until the double tap gives up.
//! let held = set.get(single).map(|r| (r.state(), r.core().pending_state()));
//! assert_eq!(held, Some((State::Possible, Some(State::Ended))));
//! assert_eq!(fired.get(), 0);
//!
//! set.advance_to(80 + 300);
//! assert_eq!(fired.get(), 1);
//! # Ok::<(), GestureError>(())
//! ```

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::RecognizerKey;
use crate::arbiter::{Arbiter, GestureDelegate, Members, StateChange};
use crate::error::{GestureError, Result};
use crate::recognizer::{Recognizer, State};
use crate::sample::{Millis, TouchSample};

#[derive(Default)]
pub struct RecognizerSet {
    members: Members,
    order: Vec<RecognizerKey>,
    delegate: Option<Box<dyn GestureDelegate>>,
    changes: VecDeque<StateChange>,
}

impl RecognizerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delegate(delegate: impl GestureDelegate + 'static) -> Self {
        let mut set = Self::new();
        set.set_delegate(delegate);
        set
    }

    pub fn set_delegate(&mut self, delegate: impl GestureDelegate + 'static) {
        self.delegate = Some(Box::new(delegate));
    }

    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    pub fn add(&mut self, recognizer: impl Recognizer) -> RecognizerKey {
        self.add_boxed(Box::new(recognizer))
    }

    pub fn add_boxed(&mut self, mut recognizer: Box<dyn Recognizer>) -> RecognizerKey {
        let key = self.members.insert_with_key(|key| {
            recognizer.core_mut().membership = Some(key);
            None
        });
        log::debug!(
            "set: added {:?}{} as {:?}",
            recognizer.kind(),
            recognizer.id(),
            key
        );
        self.members[key] = Some(recognizer);
        self.order.push(key);
        key
    }

    /// Detaches `key` from the set. Members waiting on it are released as if it
    /// had failed; its own listeners and links are cleared.
    pub fn remove(&mut self, key: RecognizerKey) -> Option<Box<dyn Recognizer>> {
        let waiting: SmallVec<[RecognizerKey; 2]> =
            SmallVec::from_slice(self.get(key)?.core().dependents());
        for dependent in waiting {
            let released = self.run_member(dependent, |r, arbiter| {
                r.handle_dependency_change(State::Failed, arbiter)
            });
            if released.is_none() {
                log::warn!("set: {:?} lists unknown dependent {:?}", key, dependent);
            }
        }
        self.deliver_changes();

        let mut recognizer = self.members.remove(key).flatten()?;
        self.order.retain(|k| *k != key);
        for other in self.members.values_mut().flatten() {
            let core = other.core_mut();
            core.dependents.retain(|k| *k != key);
            if core.dependency == Some(key) {
                core.dependency = None;
                core.pending = None;
            }
        }
        let core = recognizer.core_mut();
        core.dependency = None;
        core.pending = None;
        core.dependents.clear();
        core.membership = None;
        core.clear_state_listeners();
        log::debug!("set: removed {:?}", key);
        Some(recognizer)
    }

    /// Detaches every member, in insertion order.
    pub fn clear(&mut self) -> Vec<Box<dyn Recognizer>> {
        let keys = self.order.clone();
        keys.into_iter().filter_map(|k| self.remove(k)).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: RecognizerKey) -> bool {
        self.members.contains_key(key)
    }

    /// Member keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = RecognizerKey> + '_ {
        self.order.iter().copied()
    }

    pub fn get(&self, key: RecognizerKey) -> Option<&dyn Recognizer> {
        self.members.get(key)?.as_deref()
    }

    pub fn get_mut(&mut self, key: RecognizerKey) -> Option<&mut (dyn Recognizer + 'static)> {
        self.members.get_mut(key)?.as_deref_mut()
    }

    pub fn get_as<T: Recognizer>(&self, key: RecognizerKey) -> Option<&T> {
        self.get(key)?.downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Recognizer>(&mut self, key: RecognizerKey) -> Option<&mut T> {
        self.get_mut(key)?.downcast_mut::<T>()
    }

    /// Makes `dependent` wait for `dependency` to fail before it fires,
    /// replacing any previous dependency of `dependent`.
    pub fn require_failure_of(
        &mut self,
        dependent: RecognizerKey,
        dependency: RecognizerKey,
    ) -> Result<()> {
        for key in [dependent, dependency] {
            if !self.contains(key) {
                return Err(GestureError::UnknownRecognizer(key));
            }
        }
        let cycle = GestureError::DependencyCycle {
            dependent,
            dependency,
        };
        let mut cursor = Some(dependency);
        let mut steps = 0;
        while let Some(key) = cursor {
            if key == dependent || steps > self.order.len() {
                return Err(cycle);
            }
            cursor = self.get(key).and_then(|r| r.core().dependency());
            steps += 1;
        }

        self.clear_dependency(dependent)?;
        if let Some(r) = self.get_mut(dependent) {
            r.core_mut().dependency = Some(dependency);
        }
        log::debug!("set: {:?} requires failure of {:?}", dependent, dependency);
        Ok(())
    }

    /// Drops the dependency of `key`, unsubscribing from it. A gesture held
    /// back by that dependency is released as if the dependency had failed.
    pub fn clear_dependency(&mut self, key: RecognizerKey) -> Result<()> {
        let waiting = self
            .get(key)
            .ok_or(GestureError::UnknownRecognizer(key))?
            .core()
            .is_waiting_for_dependency();
        if waiting {
            log::debug!("set: releasing {:?} from its dependency", key);
            self.run_member(key, |r, arbiter| {
                r.handle_dependency_change(State::Failed, arbiter)
            });
            self.deliver_changes();
        }

        let recognizer = self
            .get_mut(key)
            .ok_or(GestureError::UnknownRecognizer(key))?;
        let core = recognizer.core_mut();
        let previous = core.dependency.take();
        core.pending = None;
        if let Some(previous) = previous
            && let Some(Some(old)) = self.members.get_mut(previous)
        {
            old.core_mut().dependents.retain(|k| *k != key);
        }
        Ok(())
    }

    /// Feeds one sample to every member that the delegate lets receive it.
    /// Returns true when any member reports the touch as handled.
    pub fn process_sample(&mut self, sample: &TouchSample) -> bool {
        self.advance_to(sample.event_time);
        let mut handled = false;
        for key in self.dispatch_order() {
            let consumed = self.run_member(key, |r, arbiter| {
                if arbiter.should_receive_touch(r.as_dyn(), sample) {
                    r.process_sample_with(sample, arbiter)
                } else {
                    log::trace!("set: {:?} withheld {:?} from {:?}", key, sample.action, r.id());
                    false
                }
            });
            self.deliver_changes();
            handled |= consumed.unwrap_or(false);
        }
        handled
    }

    /// Fires every member timer due at or before `now`, earliest first; ties
    /// go to the earlier member.
    pub fn advance_to(&mut self, now: Millis) {
        loop {
            let next = self
                .order
                .iter()
                .enumerate()
                .filter_map(|(index, key)| {
                    let due = self.get(*key)?.core().timers().next_due()?;
                    (due <= now).then_some((due, index, *key))
                })
                .min_by_key(|(due, index, _)| (*due, *index));
            let Some((_, _, key)) = next else {
                break;
            };
            self.run_member(key, |r, arbiter| r.fire_due_timer(now, arbiter));
            self.deliver_changes();
        }
    }

    /// Earliest pending timer across members.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.order
            .iter()
            .filter_map(|key| self.get(*key)?.core().timers().next_due())
            .min()
    }

    /// Insertion order, except that a member waiting on a dependency comes
    /// right after that dependency, so it sees the outcome of the sample
    /// before the sample itself.
    fn dispatch_order(&self) -> SmallVec<[RecognizerKey; 8]> {
        let mut ordered = SmallVec::with_capacity(self.order.len());
        for &key in &self.order {
            self.push_after_dependency(key, &mut ordered);
        }
        ordered
    }

    fn push_after_dependency(
        &self,
        key: RecognizerKey,
        ordered: &mut SmallVec<[RecognizerKey; 8]>,
    ) {
        if ordered.contains(&key) {
            return;
        }
        if let Some(core) = self.get(key).map(|r| r.core())
            && core.is_waiting_for_dependency()
            && let Some(dependency) = core.dependency()
        {
            self.push_after_dependency(dependency, ordered);
        }
        ordered.push(key);
    }

    fn run_member<R>(
        &mut self,
        key: RecognizerKey,
        f: impl FnOnce(&mut Box<dyn Recognizer>, &mut Arbiter<'_>) -> R,
    ) -> Option<R> {
        let mut recognizer = self.members.get_mut(key)?.take()?;
        let result = {
            let mut arbiter = Arbiter::attached(
                key,
                &mut self.members,
                &self.order,
                self.delegate.as_mut(),
                &mut self.changes,
            );
            f(&mut recognizer, &mut arbiter)
        };
        if let Some(slot) = self.members.get_mut(key) {
            *slot = Some(recognizer);
        }
        Some(result)
    }

    /// Delivers queued transitions to the members subscribed to them,
    /// including transitions those deliveries cause.
    fn deliver_changes(&mut self) {
        while let Some(change) = self.changes.pop_front() {
            let Some(source) = self.get(change.key) else {
                continue;
            };
            let dependents: SmallVec<[RecognizerKey; 2]> =
                SmallVec::from_slice(source.core().dependents());
            for dependent in dependents {
                self.run_member(dependent, |r, arbiter| {
                    r.handle_dependency_change(change.state, arbiter)
                });
            }
        }
    }
}
