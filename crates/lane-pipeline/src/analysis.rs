//! Per-frame lane analysis results and alerts

use binary_threshold::{ThresholdFailure, ThresholdOutcome};
use lane_tracker::{LaneFit, LaneReport};
use serde::{Deserialize, Serialize};

use crate::sanity::SanityVerdict;

/// How many lane boundaries are being tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneStatus {
    #[default]
    None,
    Single,
    Both,
}

impl LaneStatus {
    pub fn from_tracking(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, true) => LaneStatus::Both,
            (false, false) => LaneStatus::None,
            _ => LaneStatus::Single,
        }
    }

    /// Human-readable banner text
    pub fn label(&self) -> &'static str {
        match self {
            LaneStatus::None => "lanes detected: 0",
            LaneStatus::Single => "lanes detected: 1",
            LaneStatus::Both => "lanes detected: 2",
        }
    }
}

/// Lane alert types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LaneAlert {
    /// The binary threshold never reached its target band
    ThresholdFailed { reason: ThresholdFailure },

    /// Both candidates were found but failed the plausibility check
    SanityRejected { verdict: SanityVerdict },

    /// Neither lane is tracked
    NoLaneInformation,
}

/// Thresholds used on this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSummary {
    pub r_threshold: i32,
    pub v_threshold: i32,
    pub iterations: u32,
    pub foreground_fraction: f64,
    pub success: bool,
}

impl From<&ThresholdOutcome> for ThresholdSummary {
    fn from(outcome: &ThresholdOutcome) -> Self {
        Self {
            r_threshold: outcome.r_threshold,
            v_threshold: outcome.v_threshold,
            iterations: outcome.iterations,
            foreground_fraction: outcome.foreground_fraction,
            success: outcome.success(),
        }
    }
}

/// Complete lane analysis of one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneAnalysis {
    /// Source frame sequence number
    pub sequence: u32,

    /// Source frame timestamp (nanoseconds)
    pub timestamp_ns: u64,

    pub status: LaneStatus,

    pub left: LaneReport,
    pub right: LaneReport,

    /// Centre line of the ego lane, when both lanes are tracked
    pub driving_lane: Option<LaneFit>,

    /// Mean radius of curvature of both lanes (meters)
    pub radius_of_curvature_m: Option<f64>,

    /// Vehicle offset from the lane centre (meters, negative: left of centre)
    pub center_offset_m: Option<f64>,

    pub threshold: ThresholdSummary,

    /// Plausibility verdict, present when both candidates were found
    pub sanity: Option<SanityVerdict>,

    /// Active alerts
    pub alerts: Vec<LaneAlert>,
}

impl LaneAnalysis {
    /// True when neither lane is tracked
    pub fn has_critical_alerts(&self) -> bool {
        self.alerts
            .iter()
            .any(|a| matches!(a, LaneAlert::NoLaneInformation))
    }

    /// One-line overlay caption
    pub fn caption(&self) -> String {
        let mut caption = self.status.label().to_string();
        if let Some(roc) = self.radius_of_curvature_m {
            caption.push_str(&format!(", radius {:.0} m", roc));
        }
        if let Some(offset) = self.center_offset_m {
            let side = if offset < 0.0 { "left" } else { "right" };
            caption.push_str(&format!(", {:.2} m {} of centre", offset.abs(), side));
        }
        caption
    }
}

/// Running counters over a processed sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub frames: u64,
    pub threshold_failures: u64,
    pub sanity_rejections: u64,
    /// Frames ending with at least one tracked lane
    pub frames_with_lane: u64,
}

impl PipelineStats {
    pub fn record(&mut self, analysis: &LaneAnalysis) {
        self.frames += 1;
        for alert in &analysis.alerts {
            match alert {
                LaneAlert::ThresholdFailed { .. } => self.threshold_failures += 1,
                LaneAlert::SanityRejected { .. } => self.sanity_rejections += 1,
                LaneAlert::NoLaneInformation => {}
            }
        }
        if analysis.status != LaneStatus::None {
            self.frames_with_lane += 1;
        }
    }

    /// Share of frames with at least one tracked lane
    pub fn detection_rate(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.frames_with_lane as f64 / self.frames as f64
        }
    }
}
