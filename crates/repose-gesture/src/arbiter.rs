use std::collections::VecDeque;

use slotmap::SlotMap;

use crate::RecognizerKey;
use crate::recognizer::{Recognizer, State};
use crate::sample::TouchSample;

/// External arbiter consulted by a [`RecognizerSet`](crate::RecognizerSet).
///
/// Every method defaults to "allow".
pub trait GestureDelegate {
    /// Asked right before `recognizer` leaves `Possible`. Returning false makes
    /// it fail.
    fn should_begin(&mut self, recognizer: &dyn Recognizer) -> bool {
        let _ = recognizer;
        true
    }

    /// Asked once per sample per member. Returning false withholds the sample
    /// from `recognizer`.
    fn should_receive_touch(&mut self, recognizer: &dyn Recognizer, sample: &TouchSample) -> bool {
        let _ = (recognizer, sample);
        true
    }

    /// Asked before `recognizer` fires while `other` has already begun firing.
    fn should_recognize_simultaneously(
        &mut self,
        recognizer: &dyn Recognizer,
        other: &dyn Recognizer,
    ) -> bool {
        let _ = (recognizer, other);
        true
    }
}

type BeginFn = Box<dyn FnMut(&dyn Recognizer) -> bool>;
type ReceiveFn = Box<dyn FnMut(&dyn Recognizer, &TouchSample) -> bool>;
type SimultaneousFn = Box<dyn FnMut(&dyn Recognizer, &dyn Recognizer) -> bool>;

/// Closure-backed [`GestureDelegate`]; unset callbacks allow.
#[derive(Default)]
pub struct FnDelegate {
    should_begin: Option<BeginFn>,
    should_receive_touch: Option<ReceiveFn>,
    should_recognize_simultaneously: Option<SimultaneousFn>,
}

impl FnDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_when(mut self, f: impl FnMut(&dyn Recognizer) -> bool + 'static) -> Self {
        self.should_begin = Some(Box::new(f));
        self
    }

    pub fn receive_when(
        mut self,
        f: impl FnMut(&dyn Recognizer, &TouchSample) -> bool + 'static,
    ) -> Self {
        self.should_receive_touch = Some(Box::new(f));
        self
    }

    pub fn simultaneous_when(
        mut self,
        f: impl FnMut(&dyn Recognizer, &dyn Recognizer) -> bool + 'static,
    ) -> Self {
        self.should_recognize_simultaneously = Some(Box::new(f));
        self
    }
}

impl GestureDelegate for FnDelegate {
    fn should_begin(&mut self, recognizer: &dyn Recognizer) -> bool {
        self.should_begin.as_mut().is_none_or(|f| f(recognizer))
    }

    fn should_receive_touch(&mut self, recognizer: &dyn Recognizer, sample: &TouchSample) -> bool {
        self.should_receive_touch
            .as_mut()
            .is_none_or(|f| f(recognizer, sample))
    }

    fn should_recognize_simultaneously(
        &mut self,
        recognizer: &dyn Recognizer,
        other: &dyn Recognizer,
    ) -> bool {
        self.should_recognize_simultaneously
            .as_mut()
            .is_none_or(|f| f(recognizer, other))
    }
}

/// Set members. A slot is `None` while its recognizer is running.
pub(crate) type Members = SlotMap<RecognizerKey, Option<Box<dyn Recognizer>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StateChange {
    pub key: RecognizerKey,
    pub state: State,
}

/// View of the owning set handed to a running recognizer: the delegate, the
/// other members, and the outbox for state changes.
///
/// A detached arbiter (no set) allows everything and resolves no
/// dependencies.
pub struct Arbiter<'a> {
    key: Option<RecognizerKey>,
    members: Option<&'a mut Members>,
    order: &'a [RecognizerKey],
    delegate: Option<&'a mut Box<dyn GestureDelegate>>,
    changes: Option<&'a mut VecDeque<StateChange>>,
}

impl Arbiter<'static> {
    pub fn detached() -> Self {
        Arbiter {
            key: None,
            members: None,
            order: &[],
            delegate: None,
            changes: None,
        }
    }
}

impl<'a> Arbiter<'a> {
    pub(crate) fn attached(
        key: RecognizerKey,
        members: &'a mut Members,
        order: &'a [RecognizerKey],
        delegate: Option<&'a mut Box<dyn GestureDelegate>>,
        changes: &'a mut VecDeque<StateChange>,
    ) -> Self {
        Arbiter {
            key: Some(key),
            members: Some(members),
            order,
            delegate,
            changes: Some(changes),
        }
    }

    /// Key of the running recognizer, when attached to a set.
    pub fn key(&self) -> Option<RecognizerKey> {
        self.key
    }

    pub fn should_begin(&mut self, recognizer: &dyn Recognizer) -> bool {
        self.delegate
            .as_deref_mut()
            .is_none_or(|d| d.should_begin(recognizer))
    }

    pub fn should_receive_touch(&mut self, recognizer: &dyn Recognizer, sample: &TouchSample) -> bool {
        self.delegate
            .as_deref_mut()
            .is_none_or(|d| d.should_receive_touch(recognizer, sample))
    }

    /// AND over every other member that has begun firing. A lone member is
    /// always allowed.
    pub fn should_recognize_simultaneously(&mut self, recognizer: &dyn Recognizer) -> bool {
        let Some(members) = self.members.as_deref() else {
            return true;
        };
        if members.len() <= 1 {
            return true;
        }
        let Some(delegate) = self.delegate.as_deref_mut() else {
            return true;
        };
        let mut allowed = true;
        for key in self.order {
            if Some(*key) == self.key {
                continue;
            }
            let Some(other) = members.get(*key).and_then(|slot| slot.as_deref()) else {
                continue;
            };
            if other.core().has_began_firing() {
                allowed &= delegate.should_recognize_simultaneously(recognizer, other);
            }
        }
        allowed
    }

    pub fn state_of(&self, key: RecognizerKey) -> Option<State> {
        let members = self.members.as_deref()?;
        members.get(key)?.as_deref().map(|r| r.state())
    }

    /// Subscribes the running recognizer to `target`'s transitions.
    pub(crate) fn subscribe(&mut self, target: RecognizerKey) {
        let (Some(me), Some(members)) = (self.key, self.members.as_deref_mut()) else {
            return;
        };
        if let Some(Some(target)) = members.get_mut(target) {
            let dependents = &mut target.core_mut().dependents;
            if !dependents.contains(&me) {
                dependents.push(me);
            }
        }
    }

    /// Idempotent.
    pub(crate) fn unsubscribe(&mut self, target: RecognizerKey) {
        let (Some(me), Some(members)) = (self.key, self.members.as_deref_mut()) else {
            return;
        };
        if let Some(Some(target)) = members.get_mut(target) {
            target.core_mut().dependents.retain(|k| *k != me);
        }
    }

    pub(crate) fn notify_state(&mut self, state: State) {
        if let (Some(key), Some(changes)) = (self.key, self.changes.as_deref_mut()) {
            changes.push_back(StateChange { key, state });
        }
    }
}
