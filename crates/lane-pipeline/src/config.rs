//! Lane pipeline configuration

use binary_threshold::ThresholdConfig;
use camera_model::WarpConfig;
use lane_tracker::LaneConfig;
use serde::{Deserialize, Serialize};

/// Road region cropped from the undistorted frame.
///
/// The ROI spans `[x, width - x)` horizontally and `[y, height)` vertically,
/// so it stays centred whatever the frame width.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoiConfig {
    /// Columns trimmed from each side
    pub x: u32,
    /// Rows trimmed from the top
    pub y: u32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self { x: 175, y: 450 }
    }
}

impl RoiConfig {
    /// `(x, y, width, height)` of the ROI inside a frame, if it fits
    pub fn rect(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        let width = frame_width.checked_sub(self.x.checked_mul(2)?)?;
        let height = frame_height.checked_sub(self.y)?;
        (width > 0 && height > 0).then_some((self.x, self.y, width, height))
    }
}

/// Lane overlay colours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Fill between the two lane lines (RGB)
    pub fill_color: [u8; 3],

    /// Lane line colour (RGB)
    pub edge_color: [u8; 3],

    /// Lane line thickness in bird's-eye pixels
    pub edge_thickness: u32,

    /// Overlay opacity (0-1)
    pub alpha: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fill_color: [0, 255, 0],
            edge_color: [255, 255, 0],
            edge_thickness: 5,
            alpha: 0.4,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub roi: RoiConfig,
    pub warp: WarpConfig,
    pub threshold: ThresholdConfig,
    pub lane: LaneConfig,
    pub overlay: OverlayConfig,
}

impl PipelineConfig {
    /// Tuning for the twisty, shadowed "harder challenge" footage
    pub fn harder_challenge() -> Self {
        Self {
            threshold: ThresholdConfig::harder_challenge(),
            lane: LaneConfig::harder_challenge(),
            ..Default::default()
        }
    }
}
