//! Per-lane temporal tracking

use image::GrayImage;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::search::{corridor_search, sliding_window_search};
use crate::{LaneConfig, LaneFit, LaneSide};

/// Whether a lane has usable history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    /// No history: the next frame runs the sliding window search
    #[default]
    Searching,
    /// History available: the next frame searches a corridor around the best fit
    Tracking,
}

/// Snapshot of one lane for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneReport {
    pub side: LaneSide,
    pub state: TrackingState,
    pub current_fit: Option<LaneFit>,
    pub best_fit: Option<LaneFit>,
    pub missed_frames: u32,
    pub history_len: usize,
    pub radius_of_curvature_m: Option<f64>,
    pub base_position_m: Option<f64>,
}

/// Tracks one lane boundary across frames.
///
/// Each frame is a two-step exchange: [`LaneTracker::find_lane`] proposes a
/// candidate without touching state, the caller decides whether to keep it,
/// and [`LaneTracker::update`] commits the decision.
#[derive(Debug, Clone)]
pub struct LaneTracker {
    side: LaneSide,
    config: LaneConfig,
    /// Rows of the bird's-eye view
    height: u32,
    history: RingBuffer<LaneFit>,
    state: TrackingState,
    best_fit: Option<LaneFit>,
    current_fit: Option<LaneFit>,
    missed_frames: u32,
    radius_of_curvature: Option<f64>,
    base_position_m: Option<f64>,
}

impl LaneTracker {
    pub fn new(side: LaneSide, config: LaneConfig, height: u32) -> Self {
        Self {
            side,
            history: RingBuffer::new(config.tracking_window.max(1)),
            config,
            height,
            state: TrackingState::Searching,
            best_fit: None,
            current_fit: None,
            missed_frames: 0,
            radius_of_curvature: None,
            base_position_m: None,
        }
    }

    pub fn side(&self) -> LaneSide {
        self.side
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    /// Mean of the fits in the history window
    pub fn best_fit(&self) -> Option<&LaneFit> {
        self.best_fit.as_ref()
    }

    /// Fit accepted on the most recent frame
    pub fn current_fit(&self) -> Option<&LaneFit> {
        self.current_fit.as_ref()
    }

    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Radius of curvature of the best fit at the bottom row (meters)
    pub fn radius_of_curvature(&self) -> Option<f64> {
        self.radius_of_curvature
    }

    /// Best fit position at the bottom row, meters from the left edge
    pub fn base_position_m(&self) -> Option<f64> {
        self.base_position_m
    }

    /// Propose a fit for this frame without changing state.
    ///
    /// Tracking lanes look in a corridor around their best fit; searching
    /// lanes run the sliding window from the histogram peak. Fits backed by
    /// fewer than `min_track_length` rows of pixels are discarded.
    pub fn find_lane(&self, mask: &GrayImage) -> Option<LaneFit> {
        let pixels = match (self.state, self.best_fit.as_ref()) {
            (TrackingState::Tracking, Some(fit)) => corridor_search(mask, fit, self.config.search_width),
            _ => sliding_window_search(mask, self.side, &self.config),
        };

        let span = pixels.vertical_span();
        if span < f64::from(self.config.min_track_length) {
            debug!(
                side = ?self.side,
                state = ?self.state,
                pixels = pixels.len(),
                span,
                "Lane pixels too short to fit"
            );
            return None;
        }

        let fit = LaneFit::fit(&pixels);
        debug!(side = ?self.side, state = ?self.state, pixels = pixels.len(), ?fit, "Lane candidate");
        fit
    }

    /// Commit this frame's outcome: `Some` for an accepted fit, `None` for a miss
    pub fn update(&mut self, fit: Option<LaneFit>) -> TrackingState {
        match fit {
            Some(fit) => self.lane_detected(fit),
            None => self.lane_missed(),
        }

        if let (TrackingState::Tracking, Some(best)) = (self.state, self.best_fit.as_ref()) {
            let bottom = f64::from(self.height.saturating_sub(1));
            self.radius_of_curvature =
                Some(best.radius_of_curvature(bottom, self.config.scale_x, self.config.scale_y));
            self.base_position_m = Some(best.x_at(bottom) * self.config.scale_x);
        }

        self.state
    }

    fn lane_detected(&mut self, fit: LaneFit) {
        if self.state == TrackingState::Searching {
            info!(side = ?self.side, after_misses = self.missed_frames, "Lane acquired");
        }
        self.state = TrackingState::Tracking;
        self.missed_frames = 0;
        self.current_fit = Some(fit);
        self.history.push(fit);
        self.best_fit = LaneFit::mean(self.history.iter());
    }

    fn lane_missed(&mut self) {
        self.current_fit = None;
        self.missed_frames += 1;
        if self.missed_frames == self.config.no_track_frames {
            info!(side = ?self.side, missed = self.missed_frames, "Lane lost, restarting search");
            self.reinitialize();
        }
    }

    /// Drop all history and fall back to the sliding window search
    pub fn reinitialize(&mut self) {
        self.state = TrackingState::Searching;
        self.history.clear();
        self.best_fit = None;
        self.current_fit = None;
        self.radius_of_curvature = None;
        self.base_position_m = None;
    }

    /// Best fit sampled at every row, for drawing
    pub fn lane_points(&self) -> Option<Vec<(f64, f64)>> {
        self.best_fit.map(|fit| fit.points(self.height))
    }

    pub fn report(&self) -> LaneReport {
        LaneReport {
            side: self.side,
            state: self.state,
            current_fit: self.current_fit,
            best_fit: self.best_fit,
            missed_frames: self.missed_frames,
            history_len: self.history.len(),
            radius_of_curvature_m: self.radius_of_curvature,
            base_position_m: self.base_position_m,
        }
    }
}
