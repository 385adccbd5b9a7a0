//! Lane Finding Pipeline
//!
//! Per-frame road analysis for a forward-facing dashcam:
//! - Lens undistortion and road ROI crop
//! - Adaptive binary threshold
//! - Bird's-eye warp and left/right lane tracking
//! - Cross-lane plausibility check
//! - Driving lane, radius of curvature and offset from centre
//! - Lane overlay on the output frame

pub mod analysis;
pub mod config;
pub mod overlay;
pub mod sanity;

pub use analysis::{LaneAlert, LaneAnalysis, LaneStatus, PipelineStats, ThresholdSummary};
pub use config::{OverlayConfig, PipelineConfig, RoiConfig};
pub use overlay::draw_lane;
pub use sanity::{SanityCheck, SanityVerdict};

use binary_threshold::AdaptiveThreshold;
use camera_capture::{CameraError, VideoFrame};
use camera_model::{CalibrationError, CameraCalibration, PerspectiveWarp, Undistorter};
use lane_tracker::{LaneFit, LaneSide, LaneTracker};
use thiserror::Error;
use tracing::{debug, info};

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Lane finder for one camera.
///
/// Everything derived from the calibration and the frame size is built once
/// in [`LanePipeline::new`]; [`LanePipeline::process`] carries threshold and
/// lane state from one frame to the next.
pub struct LanePipeline {
    config: PipelineConfig,
    undistorter: Undistorter,
    /// `(x, y, width, height)` of the ROI in the undistorted frame
    roi: (u32, u32, u32, u32),
    warp: PerspectiveWarp,
    threshold: AdaptiveThreshold,
    left: LaneTracker,
    right: LaneTracker,
    sanity: SanityCheck,
    stats: PipelineStats,
}

impl LanePipeline {
    /// Create a pipeline for `frame_width x frame_height` frames
    pub fn new(
        config: PipelineConfig,
        calibration: &CameraCalibration,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, PipelineError> {
        let roi = config.roi.rect(frame_width, frame_height).ok_or_else(|| {
            PipelineError::Config(format!(
                "ROI {:?} does not fit a {}x{} frame",
                config.roi, frame_width, frame_height
            ))
        })?;
        let undistorter = Undistorter::new(calibration, frame_width, frame_height)?;
        let warp = PerspectiveWarp::new(&config.warp)?;
        let (_, warped_height) = warp.warped_dimensions();

        info!(
            frame_width,
            frame_height,
            roi = ?roi,
            warped = ?warp.warped_dimensions(),
            "Lane pipeline ready"
        );

        Ok(Self {
            undistorter,
            roi,
            warp,
            threshold: AdaptiveThreshold::new(config.threshold.clone()),
            left: LaneTracker::new(LaneSide::Left, config.lane.clone(), warped_height),
            right: LaneTracker::new(LaneSide::Right, config.lane.clone(), warped_height),
            sanity: SanityCheck::new(&config.lane, warped_height),
            stats: PipelineStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn left(&self) -> &LaneTracker {
        &self.left
    }

    pub fn right(&self) -> &LaneTracker {
        &self.right
    }

    /// Analyze one frame and return the analysis with the annotated frame
    pub fn process(&mut self, frame: &VideoFrame) -> Result<(LaneAnalysis, VideoFrame), PipelineError> {
        if !frame.is_consistent() {
            return Err(PipelineError::InvalidFrame(format!(
                "{} bytes for a {}x{} RGB frame",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }

        let mut output = self.undistorter.undistort(frame)?;
        let (roi_x, roi_y, roi_w, roi_h) = self.roi;
        let roi = output.crop(roi_x, roi_y, roi_w, roi_h).ok_or_else(|| {
            PipelineError::InvalidFrame(format!("ROI {:?} outside the undistorted frame", self.roi))
        })?;

        let mut alerts = Vec::new();
        let threshold = self.threshold.apply(&roi);

        let (mut left_fit, mut right_fit) = match threshold.failure {
            None => {
                let bird = self.warp.warp_mask(&threshold.mask);
                (self.left.find_lane(&bird), self.right.find_lane(&bird))
            }
            Some(reason) => {
                alerts.push(LaneAlert::ThresholdFailed { reason });
                (None, None)
            }
        };

        let sanity = match (&left_fit, &right_fit) {
            (Some(left), Some(right)) => Some(self.sanity.check(left, right)),
            _ => None,
        };
        if let Some(verdict) = sanity.filter(|v| !v.is_accepted()) {
            alerts.push(LaneAlert::SanityRejected { verdict });
            left_fit = None;
            right_fit = None;
        }

        self.left.update(left_fit);
        self.right.update(right_fit);

        let status = LaneStatus::from_tracking(self.left.is_tracking(), self.right.is_tracking());
        if status == LaneStatus::None {
            alerts.push(LaneAlert::NoLaneInformation);
        }

        let (driving_lane, radius_of_curvature_m, center_offset_m) = self.driving_lane();

        if let (Some(left_pts), Some(right_pts)) = (self.left.lane_points(), self.right.lane_points()) {
            let painted = draw_lane(&roi, &self.warp, &left_pts, &right_pts, &self.config.overlay);
            output.paste(roi_x, roi_y, &painted)?;
        }

        let analysis = LaneAnalysis {
            sequence: frame.sequence,
            timestamp_ns: frame.timestamp_ns,
            status,
            left: self.left.report(),
            right: self.right.report(),
            driving_lane,
            radius_of_curvature_m,
            center_offset_m,
            threshold: ThresholdSummary::from(&threshold),
            sanity,
            alerts,
        };
        self.stats.record(&analysis);

        debug!(
            sequence = frame.sequence,
            status = ?analysis.status,
            roc_m = ?analysis.radius_of_curvature_m,
            offset_m = ?analysis.center_offset_m,
            alerts = analysis.alerts.len(),
            "Frame analyzed"
        );

        Ok((analysis, output))
    }

    /// Centre fit, mean radius and offset, available while both lanes track
    fn driving_lane(&self) -> (Option<LaneFit>, Option<f64>, Option<f64>) {
        let (Some(left), Some(right)) = (self.left.best_fit(), self.right.best_fit()) else {
            return (None, None, None);
        };
        let centre = LaneFit::mean([left, right]);

        let radius = match (self.left.radius_of_curvature(), self.right.radius_of_curvature()) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            _ => None,
        };

        let offset = match (self.left.base_position_m(), self.right.base_position_m()) {
            (Some(l), Some(r)) => {
                let (width, _) = self.warp.warped_dimensions();
                Some(f64::from(width) / 2.0 * self.config.lane.scale_x - (l + r) / 2.0)
            }
            _ => None,
        };

        (centre, radius, offset)
    }

    /// Forget all lane history and carried-over thresholds
    pub fn reset(&mut self) {
        self.threshold.reset();
        self.left.reinitialize();
        self.right.reinitialize();
        info!("Lane pipeline reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_tracker::TrackingState;

    const W: u32 = 1280;
    const H: u32 = 720;

    fn pipeline() -> LanePipeline {
        LanePipeline::new(PipelineConfig::default(), &CameraCalibration::identity(W, H), W, H).unwrap()
    }

    /// Dark road with white lines along both edges of the default warp trapezoid
    fn road_frame(sequence: u32) -> VideoFrame {
        road_frame_with(sequence, &[0.0, 1.0])
    }

    /// Dark road with a white line at each fraction of the way across the
    /// warp trapezoid; fraction `t` lands at `100 + 440 * t` in the bird's-eye view
    fn road_frame_with(sequence: u32, fractions: &[f64]) -> VideoFrame {
        let mut frame = VideoFrame::blank(W, H);
        frame.data.iter_mut().for_each(|b| *b = 60);
        frame.sequence = sequence;

        let (roi_x, roi_y) = (175.0f64, 450.0f64);
        for row in 10..270u32 {
            let t = f64::from(row - 10) / 260.0;
            let left = 402.0 + (15.0 - 402.0) * t;
            let right = 530.0 + (930.0 - 530.0) * t;
            for fraction in fractions {
                let centre = left + (right - left) * fraction;
                for dx in -5i64..5 {
                    let x = ((roi_x + centre).round() as i64 + dx).clamp(0, i64::from(W) - 1) as u32;
                    let idx = (((roi_y as u32 + row) * W + x) * 3) as usize;
                    frame.data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
                }
            }
        }
        frame
    }

    #[test]
    fn test_finds_both_lanes_on_straight_road() {
        let mut pipeline = pipeline();
        assert_eq!(pipeline.config().roi.y, 450);
        let (analysis, output) = pipeline.process(&road_frame(0)).unwrap();

        assert!(analysis.threshold.success);
        assert_eq!(analysis.status, LaneStatus::Both);
        assert_eq!(analysis.sanity, Some(SanityVerdict::Accepted));
        assert!(analysis.alerts.is_empty());

        let left = analysis.left.best_fit.unwrap();
        let right = analysis.right.best_fit.unwrap();
        assert!((left.x_at(120.0) - 100.0).abs() < 8.0);
        assert!((right.x_at(120.0) - 540.0).abs() < 8.0);

        assert!(analysis.center_offset_m.unwrap().abs() < 0.1);
        assert!(analysis.radius_of_curvature_m.unwrap() > 500.0);

        // Lane fill blended over the road between the lines
        assert_eq!((output.width, output.height), (W, H));
        let [r, g, _] = output.get_pixel(175 + 472, 450 + 260).unwrap();
        assert!(g > r, "expected green tint, got r={} g={}", r, g);
    }

    #[test]
    fn test_sanity_rejection_drops_both_candidates() {
        let mut pipeline = pipeline();
        // Bird's-eye columns ~232 and ~342: a 110px lane is too narrow
        let (analysis, _) = pipeline.process(&road_frame_with(0, &[0.3, 0.55])).unwrap();

        assert!(analysis.threshold.success);
        assert!(matches!(analysis.sanity, Some(SanityVerdict::LaneTooNarrow { .. })));
        assert!(analysis
            .alerts
            .iter()
            .any(|a| matches!(a, LaneAlert::SanityRejected { .. })));
        assert_eq!(analysis.status, LaneStatus::None);
        assert_eq!(pipeline.left().state(), TrackingState::Searching);
        assert_eq!(pipeline.right().state(), TrackingState::Searching);
        assert_eq!(pipeline.left().missed_frames(), 1);
        assert_eq!(pipeline.stats().sanity_rejections, 1);
    }

    #[test]
    fn test_lane_centre_right_of_car_gives_negative_offset() {
        let mut pipeline = pipeline();
        // Lines at ~188 and ~540: lane centre ~364, right of the image centre 320
        let (analysis, _) = pipeline.process(&road_frame_with(0, &[0.2, 1.0])).unwrap();

        assert_eq!(analysis.status, LaneStatus::Both);
        let offset = analysis.center_offset_m.unwrap();
        assert!(offset < -0.2, "offset {}", offset);
        assert!(analysis.caption().contains("left of centre"));
    }

    #[test]
    fn test_history_builds_over_frames() {
        let mut pipeline = pipeline();
        for seq in 0..3 {
            pipeline.process(&road_frame(seq)).unwrap();
        }
        assert_eq!(pipeline.left().history_len(), 3);
        assert_eq!(pipeline.right().state(), TrackingState::Tracking);
        assert_eq!(pipeline.stats().frames_with_lane, 3);

        pipeline.reset();
        assert!(!pipeline.left().is_tracking());
        assert_eq!(pipeline.right().history_len(), 0);
    }

    #[test]
    fn test_blank_frame_fails_threshold() {
        let mut pipeline = pipeline();
        let mut frame = VideoFrame::blank(W, H);
        frame.data.iter_mut().for_each(|b| *b = 60);

        let (analysis, output) = pipeline.process(&frame).unwrap();
        assert!(!analysis.threshold.success);
        assert_eq!(analysis.status, LaneStatus::None);
        assert!(analysis.has_critical_alerts());
        assert!(matches!(analysis.alerts[0], LaneAlert::ThresholdFailed { .. }));
        assert_eq!(output.data, frame.data);
        assert_eq!(pipeline.stats().threshold_failures, 1);
    }

    #[test]
    fn test_lanes_coast_through_a_bad_frame() {
        let mut pipeline = pipeline();
        pipeline.process(&road_frame(0)).unwrap();

        let mut dark = VideoFrame::blank(W, H);
        dark.data.iter_mut().for_each(|b| *b = 60);
        let (analysis, _) = pipeline.process(&dark).unwrap();

        assert_eq!(analysis.status, LaneStatus::Both);
        assert_eq!(analysis.left.missed_frames, 1);
        assert!(analysis.driving_lane.is_some());
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let mut pipeline = pipeline();
        let result = pipeline.process(&VideoFrame::blank(640, 480));
        assert!(matches!(
            result,
            Err(PipelineError::Calibration(CalibrationError::FrameSize { .. }))
        ));

        let mut truncated = VideoFrame::blank(W, H);
        truncated.data.truncate(10);
        assert!(matches!(pipeline.process(&truncated), Err(PipelineError::InvalidFrame(_))));
    }

    #[test]
    fn test_roi_must_fit_frame() {
        let result = LanePipeline::new(PipelineConfig::default(), &CameraCalibration::identity(320, 240), 320, 240);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
