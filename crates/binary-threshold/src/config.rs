//! Threshold search configuration

use serde::{Deserialize, Serialize};

/// Allowed band for one channel threshold and the step used to move it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: i32,
    pub max: i32,
    pub step: i32,
}

impl ThresholdRange {
    pub const fn new(min: i32, max: i32, step: i32) -> Self {
        Self { min, max, step }
    }

    /// Whether `value` may still be nudged
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Adaptive threshold configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Red channel threshold band
    pub r_range: ThresholdRange,

    /// HSV value channel threshold band
    pub v_range: ThresholdRange,

    /// Red threshold used on the first frame and after a failed search
    pub r_init: i32,

    /// Value threshold used on the first frame and after a failed search
    pub v_init: i32,

    /// Give up after this many nudges
    pub bailout: u32,

    /// Lower bound of the foreground fraction (inclusive)
    pub min_lane_fraction: f64,

    /// Upper bound of the foreground fraction (exclusive)
    pub max_lane_fraction: f64,

    /// Step reduction applied once half the bailout budget is spent.
    /// The reduced step is clamped to at least 1, so a reduction at or above
    /// a range's `step` still moves that threshold by one per nudge.
    pub fine_step_reduction: i32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            r_range: ThresholdRange::new(140, 250, 5),
            v_range: ThresholdRange::new(140, 240, 5),
            r_init: 150,
            v_init: 150,
            bailout: 25,
            min_lane_fraction: 0.015,
            max_lane_fraction: 0.03,
            fine_step_reduction: 3,
        }
    }
}

impl ThresholdConfig {
    /// Wider band for footage with heavy shadows and worn paint
    pub fn harder_challenge() -> Self {
        Self {
            max_lane_fraction: 0.035,
            ..Default::default()
        }
    }
}
