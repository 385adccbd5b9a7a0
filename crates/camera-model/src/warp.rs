//! Bird's-eye perspective transform

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::CalibrationError;

/// Source trapezoid (in ROI pixel coordinates) and bird's-eye output geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpConfig {
    /// Road trapezoid corners: top-left, top-right, bottom-right, bottom-left
    pub src: [(f32, f32); 4],
    /// Horizontal inset of the destination rectangle
    pub offset: f32,
    /// Bird's-eye image width
    pub warped_width: u32,
    /// Bird's-eye image height
    pub warped_height: u32,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            src: [(402.0, 10.0), (530.0, 10.0), (930.0, 270.0), (15.0, 270.0)],
            offset: 100.0,
            warped_width: 640,
            warped_height: 240,
        }
    }
}

impl WarpConfig {
    /// Destination rectangle matching `src` corner order
    pub fn dst(&self) -> [(f32, f32); 4] {
        let w = self.warped_width as f32;
        let h = self.warped_height as f32;
        [
            (self.offset, 0.0),
            (w - self.offset, 0.0),
            (w - self.offset, h),
            (self.offset, h),
        ]
    }
}

/// Forward (`M`) and inverse (`Minv`) projections between the ROI and the
/// bird's-eye view, computed once and reused for every frame.
#[derive(Debug, Clone)]
pub struct PerspectiveWarp {
    forward: Projection,
    inverse: Projection,
    warped_width: u32,
    warped_height: u32,
}

impl PerspectiveWarp {
    pub fn new(config: &WarpConfig) -> Result<Self, CalibrationError> {
        let dst = config.dst();
        if config.warped_width == 0 || config.warped_height == 0 || has_collinear_triple(&dst) {
            return Err(CalibrationError::DegenerateWarp(format!(
                "destination {:?} is degenerate",
                dst
            )));
        }
        if has_collinear_triple(&config.src) {
            return Err(CalibrationError::DegenerateWarp(format!(
                "source points {:?} contain a collinear triple",
                config.src
            )));
        }

        let forward = Projection::from_control_points(config.src, dst).ok_or_else(|| {
            CalibrationError::DegenerateWarp(format!("no projection maps {:?} to {:?}", config.src, dst))
        })?;
        let inverse = forward.invert();

        debug!(
            width = config.warped_width,
            height = config.warped_height,
            "Perspective warp ready"
        );

        Ok(Self {
            forward,
            inverse,
            warped_width: config.warped_width,
            warped_height: config.warped_height,
        })
    }

    pub fn warped_dimensions(&self) -> (u32, u32) {
        (self.warped_width, self.warped_height)
    }

    /// Warp a binary ROI mask to the bird's-eye view.
    ///
    /// Nearest-neighbour sampling keeps the output strictly 0/255.
    pub fn warp_mask(&self, mask: &GrayImage) -> GrayImage {
        let mut out = GrayImage::new(self.warped_width, self.warped_height);
        warp_into(mask, &self.forward, Interpolation::Nearest, Luma([0]), &mut out);
        out
    }

    /// Project a bird's-eye drawing back onto a `width x height` ROI
    pub fn unwarp_rgb(&self, image: &RgbImage, width: u32, height: u32) -> RgbImage {
        let mut out = RgbImage::new(width, height);
        warp_into(image, &self.inverse, Interpolation::Nearest, Rgb([0, 0, 0]), &mut out);
        out
    }
}

fn has_collinear_triple(points: &[(f32, f32); 4]) -> bool {
    const EPS: f32 = 1e-3;
    let cross = |a: (f32, f32), b: (f32, f32), c: (f32, f32)| {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    };
    (0..4).any(|skip| {
        let tri: Vec<(f32, f32)> = (0..4).filter(|i| *i != skip).map(|i| points[i]).collect();
        cross(tri[0], tri[1], tri[2]).abs() < EPS
    })
}
