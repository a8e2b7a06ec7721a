// Geometric features extracted from keypoints: joint angles and smoothing

use std::collections::VecDeque;

/// Angle at joint `b` formed by segments b->a and b->c, in degrees.
///
/// Uses the dot product: cos(θ) = (v1 · v2) / (|v1| × |v2|)
/// - 180° = straight limb
/// - 90° = right angle
///
/// Returns `None` when either segment is degenerate.
pub fn joint_angle(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> Option<f32> {
    let v1 = (a.0 - b.0, a.1 - b.1);
    let v2 = (c.0 - b.0, c.1 - b.1);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 < 0.0001 || mag2 < 0.0001 {
        return None;
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Angle of the segment a->b from horizontal, folded into [0, 90] degrees.
/// 0° = horizontal, 90° = vertical.
pub fn incline_from_horizontal(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = (b.0 - a.0).abs();
    let dy = (b.1 - a.1).abs();
    dy.atan2(dx).to_degrees()
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

// ==============================================================================
// Moving Average
// ==============================================================================

/// Short moving average over the most recent samples.
/// Owned by a classifier and cleared on session reset.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f32>,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Push a sample and return the current mean
    pub fn push(&mut self, value: f32) -> f32 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.mean().unwrap_or(value)
    }

    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
