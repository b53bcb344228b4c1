//! Per-recognizer delay queue.
//!
//! Nothing here runs on its own: the owning [`RecognizerSet`](crate::RecognizerSet)
//! (or a standalone recognizer) pops due entries from `advance_to(now)` on the
//! same thread that delivers touch samples, so a timer never races a sample.

use smallvec::SmallVec;

use crate::sample::Millis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerTag {
    /// Return to `Possible` after a terminal state.
    Reset,
    /// A deadline passed without the gesture completing.
    Fail,
    /// Minimum press duration reached.
    LongPress,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scheduled {
    due: Millis,
    seq: u64,
    tag: TimerTag,
}

/// Ordered by `(due, scheduling order)`.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    entries: SmallVec<[Scheduled; 4]>,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `tag` at the absolute time `due`. Other entries, including
    /// ones with the same tag, are left alone.
    pub fn schedule_at(&mut self, tag: TimerTag, due: Millis) {
        let seq = self.seq;
        self.seq += 1;
        let at = self
            .entries
            .iter()
            .position(|e| (e.due, e.seq) > (due, seq))
            .unwrap_or(self.entries.len());
        self.entries.insert(at, Scheduled { due, seq, tag });
    }

    /// Removes every pending entry carrying one of `tags`.
    pub fn cancel(&mut self, tags: &[TimerTag]) {
        self.entries.retain(|e| !tags.contains(&e.tag));
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn has_pending(&self, tags: &[TimerTag]) -> bool {
        self.entries.iter().any(|e| tags.contains(&e.tag))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.entries.first().map(|e| e.due)
    }

    /// Pops the earliest entry due at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, TimerTag)> {
        match self.entries.first() {
            Some(e) if e.due <= now => {
                let e = self.entries.remove(0);
                Some((e.due, e.tag))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule_at(TimerTag::Fail, 300);
        q.schedule_at(TimerTag::LongPress, 100);
        q.schedule_at(TimerTag::Reset, 300);

        assert_eq!(q.next_due(), Some(100));
        assert_eq!(q.pop_due(50), None);
        assert_eq!(q.pop_due(400), Some((100, TimerTag::LongPress)));
        assert_eq!(q.pop_due(400), Some((300, TimerTag::Fail)));
        assert_eq!(q.pop_due(400), Some((300, TimerTag::Reset)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel_only_named_tags() {
        let mut q = TimerQueue::new();
        q.schedule_at(TimerTag::Fail, 10);
        q.schedule_at(TimerTag::LongPress, 20);
        q.schedule_at(TimerTag::Fail, 30);

        q.cancel(&[TimerTag::Fail]);
        assert!(!q.has_pending(&[TimerTag::Fail]));
        assert!(q.has_pending(&[TimerTag::LongPress, TimerTag::Reset]));
        assert_eq!(q.len(), 1);
    }
}
