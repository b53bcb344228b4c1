//! Platform-neutral touch samples.
//!
//! The embedding layer translates each native pointer event into one
//! [`TouchSample`] and hands it to a [`RecognizerSet`](crate::RecognizerSet).
//! [`TouchStream`] does the bookkeeping (active pointers, down time, action
//! index) for callers that receive per-pointer events.

use smallvec::SmallVec;

use crate::geometry::Vec2;

/// Milliseconds on the embedder's monotonic clock.
pub type Millis = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TouchAction {
    /// First pointer of a sequence went down.
    Down,
    /// An additional pointer went down.
    PointerDown,
    Move,
    /// A pointer went up while others remain.
    PointerUp,
    /// The last pointer went up.
    Up,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TouchPoint {
    pub id: PointerId,
    pub position: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TouchSample {
    pub action: TouchAction,
    /// Every pointer in contact, including the one going up on
    /// `PointerUp`/`Up`.
    pub pointers: SmallVec<[TouchPoint; 4]>,
    /// Index into `pointers` of the pointer going down (`PointerDown`) or up
    /// (`PointerUp`).
    pub action_index: usize,
    pub event_time: Millis,
    /// Time of the `Down` that started this sequence.
    pub down_time: Millis,
}

impl TouchSample {
    pub fn new(action: TouchAction, event_time: Millis, down_time: Millis) -> Self {
        Self {
            action,
            pointers: SmallVec::new(),
            action_index: 0,
            event_time,
            down_time,
        }
    }

    pub fn with_pointer(mut self, id: u64, x: f32, y: f32) -> Self {
        self.pointers.push(TouchPoint {
            id: PointerId(id),
            position: Vec2::new(x, y),
        });
        self
    }

    pub fn with_action_index(mut self, index: usize) -> Self {
        self.action_index = index;
        self
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn position(&self, index: usize) -> Option<Vec2> {
        self.pointers.get(index).map(|p| p.position)
    }

    pub fn find(&self, id: PointerId) -> Option<&TouchPoint> {
        self.pointers.iter().find(|p| p.id == id)
    }

    /// Pointers that stay relevant for this sample: all of them, minus the one
    /// lifting on `PointerUp`.
    pub fn active_points(&self) -> impl Iterator<Item = &TouchPoint> + '_ {
        let skip = match self.action {
            TouchAction::PointerUp => Some(self.action_index),
            _ => None,
        };
        self.pointers
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != skip)
            .map(|(_, p)| p)
    }

    /// Number of pointers still down once this sample is applied.
    pub fn remaining_count(&self) -> usize {
        match self.action {
            TouchAction::Up | TouchAction::Cancel => 0,
            TouchAction::PointerUp => self.pointers.len().saturating_sub(1),
            _ => self.pointers.len(),
        }
    }

    /// Centroid of the active pointers.
    pub fn focal_point(&self) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0usize;
        for p in self.active_points() {
            sum += p.position;
            count += 1;
        }
        if count == 0 {
            Vec2::ZERO
        } else {
            sum / count as f32
        }
    }

    /// Vector from the first to the second active pointer.
    pub fn span_vector(&self) -> Option<Vec2> {
        let mut points = self.active_points();
        let a = points.next()?.position;
        let b = points.next()?.position;
        Some(b - a)
    }

    /// True once no pointer remains after this sample.
    pub fn ends_sequence(&self) -> bool {
        matches!(self.action, TouchAction::Up | TouchAction::Cancel)
    }
}

/// Builds well-formed [`TouchSample`]s from per-pointer events.
#[derive(Clone, Debug, Default)]
pub struct TouchStream {
    pointers: SmallVec<[TouchPoint; 4]>,
    down_time: Millis,
}

impl TouchStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.pointers.len()
    }

    fn sample(&self, action: TouchAction, index: usize, time: Millis) -> TouchSample {
        TouchSample {
            action,
            pointers: self.pointers.clone(),
            action_index: index,
            event_time: time,
            down_time: self.down_time,
        }
    }

    pub fn down(&mut self, id: u64, x: f32, y: f32, time: Millis) -> TouchSample {
        let action = if self.pointers.is_empty() {
            self.down_time = time;
            TouchAction::Down
        } else {
            TouchAction::PointerDown
        };
        self.pointers.retain(|p| p.id != PointerId(id));
        self.pointers.push(TouchPoint {
            id: PointerId(id),
            position: Vec2::new(x, y),
        });
        self.sample(action, self.pointers.len() - 1, time)
    }

    pub fn move_to(&mut self, id: u64, x: f32, y: f32, time: Millis) -> TouchSample {
        self.move_all(&[(id, x, y)], time)
    }

    /// Moves several pointers in one sample.
    pub fn move_all(&mut self, positions: &[(u64, f32, f32)], time: Millis) -> TouchSample {
        for &(id, x, y) in positions {
            match self.pointers.iter_mut().find(|p| p.id == PointerId(id)) {
                Some(p) => p.position = Vec2::new(x, y),
                None => log::warn!("TouchStream: move for unknown pointer {id}"),
            }
        }
        self.sample(TouchAction::Move, 0, time)
    }

    pub fn up(&mut self, id: u64, time: Millis) -> TouchSample {
        let Some(index) = self.pointers.iter().position(|p| p.id == PointerId(id)) else {
            log::warn!("TouchStream: up for unknown pointer {id}");
            return self.sample(TouchAction::Move, 0, time);
        };
        let action = if self.pointers.len() > 1 {
            TouchAction::PointerUp
        } else {
            TouchAction::Up
        };
        let sample = self.sample(action, index, time);
        self.pointers.remove(index);
        sample
    }

    pub fn cancel(&mut self, time: Millis) -> TouchSample {
        let sample = self.sample(TouchAction::Cancel, 0, time);
        self.pointers.clear();
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focal_point_excludes_lifting_pointer() {
        let sample = TouchSample::new(TouchAction::PointerUp, 10, 0)
            .with_pointer(0, 0.0, 0.0)
            .with_pointer(1, 100.0, 50.0)
            .with_pointer(2, 50.0, 100.0)
            .with_action_index(1);
        assert_eq!(sample.focal_point(), Vec2::new(25.0, 50.0));
        assert_eq!(sample.remaining_count(), 2);

        let moving = TouchSample { action: TouchAction::Move, ..sample };
        assert_eq!(moving.focal_point(), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_stream_actions_and_down_time() {
        let mut stream = TouchStream::new();
        let a = stream.down(7, 1.0, 1.0, 100);
        assert_eq!(a.action, TouchAction::Down);
        assert_eq!(a.down_time, 100);

        let b = stream.down(8, 3.0, 3.0, 120);
        assert_eq!(b.action, TouchAction::PointerDown);
        assert_eq!(b.action_index, 1);
        assert_eq!(b.down_time, 100);
        assert_eq!(b.focal_point(), Vec2::new(2.0, 2.0));

        let c = stream.up(7, 150);
        assert_eq!(c.action, TouchAction::PointerUp);
        assert_eq!(c.action_index, 0);
        assert_eq!(c.pointer_count(), 2);
        assert_eq!(c.focal_point(), Vec2::new(3.0, 3.0));

        let d = stream.up(8, 160);
        assert_eq!(d.action, TouchAction::Up);
        assert_eq!(d.remaining_count(), 0);
        assert_eq!(stream.active(), 0);
    }

    #[test]
    fn test_span_vector() {
        let mut stream = TouchStream::new();
        stream.down(0, 10.0, 10.0, 0);
        let s = stream.down(1, 20.0, 10.0, 5);
        assert_eq!(s.span_vector(), Some(Vec2::new(10.0, 0.0)));
        let s = stream.up(0, 10);
        assert_eq!(s.span_vector(), None);
    }
}
