//! Cross-lane plausibility check

use lane_tracker::{LaneConfig, LaneFit, LaneSide};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of checking a left/right pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SanityVerdict {
    Accepted,
    /// The right line sits left of (or on) the left line at `row`
    Crossed { row: f64 },
    LaneTooNarrow { row: f64, width_px: f64 },
    LaneTooWide { row: f64, width_px: f64 },
    CurveTooTight { side: LaneSide, radius_m: f64 },
}

impl SanityVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SanityVerdict::Accepted)
    }
}

/// Lane width band and minimum radius of curvature
#[derive(Debug, Clone)]
pub struct SanityCheck {
    min_lane_width: f64,
    max_lane_width: f64,
    min_roc: f64,
    scale_x: f64,
    scale_y: f64,
    height: u32,
}

impl SanityCheck {
    pub fn new(config: &LaneConfig, height: u32) -> Self {
        Self {
            min_lane_width: config.min_lane_width,
            max_lane_width: config.max_lane_width,
            min_roc: config.min_roc,
            scale_x: config.scale_x,
            scale_y: config.scale_y,
            height,
        }
    }

    /// Check the pair at the bottom and top rows of the bird's-eye view
    pub fn check(&self, left: &LaneFit, right: &LaneFit) -> SanityVerdict {
        let bottom = f64::from(self.height.saturating_sub(1));

        for row in [bottom, 0.0] {
            let width_px = right.x_at(row) - left.x_at(row);
            let verdict = if width_px <= 0.0 {
                SanityVerdict::Crossed { row }
            } else if width_px < self.min_lane_width {
                SanityVerdict::LaneTooNarrow { row, width_px }
            } else if width_px > self.max_lane_width {
                SanityVerdict::LaneTooWide { row, width_px }
            } else {
                continue;
            };
            debug!(?verdict, "Lane pair rejected");
            return verdict;
        }

        for (side, fit) in [(LaneSide::Left, left), (LaneSide::Right, right)] {
            let radius_m = fit.radius_of_curvature(bottom, self.scale_x, self.scale_y);
            if radius_m < self.min_roc {
                let verdict = SanityVerdict::CurveTooTight { side, radius_m };
                debug!(?verdict, "Lane pair rejected");
                return verdict;
            }
        }

        SanityVerdict::Accepted
    }
}
