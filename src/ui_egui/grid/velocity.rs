//! Pointer velocity estimation for flings.

use std::collections::VecDeque;

use egui::{Pos2, Vec2};

const HISTORY_SIZE: usize = 20;

/// Only samples this recent contribute to the estimate.
const HORIZON_MS: u64 = 100;

/// A pointer that has not moved for this long is treated as stopped.
const ASSUME_STOPPED_MS: u64 = 40;

/// Recency weight applied per sample, newest first.
const DECAY: f32 = 0.95;

#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    samples: VecDeque<(u64, Pos2)>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample. A sample with the same timestamp as the newest one
    /// replaces it, so events batched into one frame count once.
    pub fn add(&mut self, time_ms: u64, position: Pos2) {
        if let Some(newest) = self.samples.back_mut() {
            if newest.0 == time_ms {
                newest.1 = position;
                return;
            }
        }
        if self.samples.len() == HISTORY_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back((time_ms, position));
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Velocity in px/s as seen at `now_ms`, zero with fewer than two
    /// usable samples or when the pointer has rested.
    pub fn velocity(&self, now_ms: u64) -> Vec2 {
        let Some(&(newest_ms, _)) = self.samples.back() else {
            return Vec2::ZERO;
        };
        if now_ms.saturating_sub(newest_ms) > ASSUME_STOPPED_MS {
            return Vec2::ZERO;
        }

        let window: Vec<(f32, Pos2)> = self
            .samples
            .iter()
            .rev()
            .take_while(|(time_ms, _)| newest_ms - time_ms <= HORIZON_MS)
            .map(|&(time_ms, position)| (-((newest_ms - time_ms) as f32), position))
            .collect();

        if window.len() < 2 {
            return Vec2::ZERO;
        }

        Vec2::new(
            slope(window.iter().map(|(t, p)| (*t, p.x))),
            slope(window.iter().map(|(t, p)| (*t, p.y))),
        ) * 1000.0
    }
}

/// Weighted least-squares slope of `x` over `t`, newest sample first.
fn slope(points: impl Iterator<Item = (f32, f32)>) -> f32 {
    let mut sum_w = 0.0f32;
    let mut sum_t = 0.0f32;
    let mut sum_x = 0.0f32;
    let mut sum_tt = 0.0f32;
    let mut sum_tx = 0.0f32;

    let mut weight = 1.0f32;
    for (t, x) in points {
        sum_w += weight;
        sum_t += weight * t;
        sum_x += weight * x;
        sum_tt += weight * t * t;
        sum_tx += weight * t * x;
        weight *= DECAY;
    }

    let denom = sum_w * sum_tt - sum_t * sum_t;
    if denom.abs() < f32::EPSILON {
        return 0.0;
    }
    (sum_w * sum_tx - sum_t * sum_x) / denom
}
