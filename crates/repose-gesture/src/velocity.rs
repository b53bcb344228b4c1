use std::collections::VecDeque;

use crate::constants::{self, MAX_FLING_VELOCITY};
use crate::geometry::Vec2;
use crate::sample::Millis;

const HISTORY: usize = 20;

/// Least-squares velocity estimate over recent focal-point samples.
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    samples: VecDeque<(Millis, Vec2)>,
    max_velocity: f32,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new(MAX_FLING_VELOCITY)
    }
}

impl VelocityTracker {
    pub fn new(max_velocity: f32) -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY),
            max_velocity,
        }
    }

    pub fn set_max_velocity(&mut self, max_velocity: f32) {
        self.max_velocity = max_velocity;
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn add(&mut self, time: Millis, position: Vec2) {
        if self.samples.len() == HISTORY {
            self.samples.pop_front();
        }
        self.samples.push_back((time, position));
    }

    /// Pixels per second (1000 ms), clamped to the configured maximum.
    pub fn velocity(&self) -> Vec2 {
        let Some(&(newest, _)) = self.samples.back() else {
            return Vec2::ZERO;
        };
        let horizon = constants::millis(constants::VELOCITY_HORIZON);
        let len = self.samples.len();
        let window: Vec<(f32, Vec2)> = self
            .samples
            .iter()
            .enumerate()
            .filter(|(i, (t, _))| len - i <= 2 || newest - t <= horizon)
            .map(|(_, (t, p))| ((newest - t) as f32, *p))
            .collect();
        if window.len() < 2 {
            return Vec2::ZERO;
        }

        let n = window.len() as f32;
        let mean_t = window.iter().map(|(t, _)| t).sum::<f32>() / n;
        let mean_p = window.iter().fold(Vec2::ZERO, |acc, (_, p)| acc + *p) / n;
        let mut num = Vec2::ZERO;
        let mut den = 0.0f32;
        for (t, p) in &window {
            let dt = t - mean_t;
            num += (*p - mean_p) * dt;
            den += dt * dt;
        }
        if den <= f32::EPSILON {
            return Vec2::ZERO;
        }
        // t counts age backwards from the newest sample, hence the sign flip.
        let per_ms = -(num / den);
        (per_ms * 1000.0).clamp_length(self.max_velocity)
    }
}
