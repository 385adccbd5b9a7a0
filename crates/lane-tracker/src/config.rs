//! Lane search and tracking configuration

use serde::{Deserialize, Serialize};

/// Lane tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Number of recent fits averaged into the best fit
    pub tracking_window: usize,

    /// Horizontal scale of the bird's-eye view (meters per pixel)
    pub scale_x: f64,

    /// Vertical scale of the bird's-eye view (meters per pixel)
    pub scale_y: f64,

    /// Rows at the bottom of the mask used for the seed histogram
    pub hist_height: u32,

    /// Sliding window height (pixels)
    pub sw_height: u32,

    /// Sliding window half width (pixels)
    pub sw_width: u32,

    /// Pixels a window needs before it recentres
    pub num_white: usize,

    /// Half width of the corridor around the previous fit when tracking
    pub search_width: f64,

    /// Minimum vertical extent (pixels) of the pixels behind a fit
    pub min_track_length: u32,

    /// Consecutive misses before a lane is dropped and searched from scratch
    pub no_track_frames: u32,

    /// Narrowest plausible lane (pixels in the bird's-eye view)
    pub min_lane_width: f64,

    /// Widest plausible lane (pixels in the bird's-eye view)
    pub max_lane_width: f64,

    /// Tightest plausible radius of curvature (meters)
    pub min_roc: f64,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            tracking_window: ring_buffer::DEFAULT_CAPACITY,
            scale_x: 3.7 / 420.0,
            scale_y: 3.048 / 33.0,
            hist_height: 100,
            sw_height: 24,
            sw_width: 40,
            num_white: 50,
            search_width: 50.0,
            min_track_length: 40,
            no_track_frames: 15,
            min_lane_width: 140.0,
            max_lane_width: 520.0,
            min_roc: 90.0,
        }
    }
}

impl LaneConfig {
    /// Short memory and stricter curvature for twisty mountain roads
    pub fn harder_challenge() -> Self {
        Self {
            tracking_window: 5,
            min_roc: 130.0,
            ..Default::default()
        }
    }
}
