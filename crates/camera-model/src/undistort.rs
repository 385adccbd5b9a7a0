//! Lens undistortion via a precomputed remap table

use camera_capture::VideoFrame;
use tracing::debug;

use crate::{CalibrationError, CameraCalibration};

/// Removes lens distortion from frames of a fixed size.
///
/// The output keeps the original camera matrix, so straight lines in the
/// world become straight in the image without changing the field of view.
#[derive(Debug, Clone)]
pub struct Undistorter {
    width: u32,
    height: u32,
    /// Source coordinates for each output pixel, row-major.
    /// `None` when the whole calibration is distortion free.
    lut: Option<Vec<(f32, f32)>>,
}

impl Undistorter {
    /// Precompute the remap table for `width x height` frames
    pub fn new(calibration: &CameraCalibration, width: u32, height: u32) -> Result<Self, CalibrationError> {
        calibration.validate()?;

        if calibration.is_distortion_free() {
            debug!(width, height, "Calibration is distortion free; undistort is a copy");
            return Ok(Self { width, height, lut: None });
        }

        let (fx, fy, cx, cy) = (calibration.fx(), calibration.fy(), calibration.cx(), calibration.cy());
        let mut lut = Vec::with_capacity((width * height) as usize);
        for v in 0..height {
            for u in 0..width {
                let x = (u as f64 - cx) / fx;
                let y = (v as f64 - cy) / fy;
                let (xd, yd) = calibration.distort_normalized(x, y);
                lut.push(((fx * xd + cx) as f32, (fy * yd + cy) as f32));
            }
        }

        debug!(width, height, "Built undistortion table");
        Ok(Self { width, height, lut: Some(lut) })
    }

    /// Undistort one frame
    pub fn undistort(&self, frame: &VideoFrame) -> Result<VideoFrame, CalibrationError> {
        if (frame.width, frame.height) != (self.width, self.height) {
            return Err(CalibrationError::FrameSize {
                expected: (self.width, self.height),
                actual: (frame.width, frame.height),
            });
        }

        let Some(lut) = &self.lut else {
            return Ok(frame.clone());
        };

        let mut data = Vec::with_capacity(frame.data.len());
        for &(sx, sy) in lut {
            data.extend_from_slice(&sample_bilinear(frame, sx, sy));
        }

        Ok(VideoFrame::new(
            data,
            frame.width,
            frame.height,
            frame.timestamp_ns,
            frame.sequence,
        ))
    }
}

/// Bilinear sample; black outside the frame
fn sample_bilinear(frame: &VideoFrame, x: f32, y: f32) -> [u8; 3] {
    if x < 0.0 || y < 0.0 || x > (frame.width - 1) as f32 || y > (frame.height - 1) as f32 {
        return [0, 0, 0];
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(frame.width - 1);
    let y1 = (y0 + 1).min(frame.height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = frame.get_pixel(x0, y0).unwrap_or_default();
    let p10 = frame.get_pixel(x1, y0).unwrap_or_default();
    let p01 = frame.get_pixel(x0, y1).unwrap_or_default();
    let p11 = frame.get_pixel(x1, y1).unwrap_or_default();

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
