//! Camera intrinsics and lens distortion

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::CalibrationError;

/// Pinhole intrinsics plus Brown-Conrady distortion coefficients.
///
/// `dist_coeffs` uses the usual `[k1, k2, p1, p2, k3]` ordering, so files
/// written by common calibration tools load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// 3x3 camera matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    pub camera_matrix: [[f64; 3]; 3],
    /// Radial (k1, k2, k3) and tangential (p1, p2) coefficients
    pub dist_coeffs: [f64; 5],
}

impl CameraCalibration {
    /// Calibration with no distortion, centred on a `width x height` sensor
    pub fn identity(width: u32, height: u32) -> Self {
        let f = width.max(height) as f64;
        Self {
            camera_matrix: [
                [f, 0.0, width as f64 / 2.0],
                [0.0, f, height as f64 / 2.0],
                [0.0, 0.0, 1.0],
            ],
            dist_coeffs: [0.0; 5],
        }
    }

    /// Load a calibration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let calibration: Self = serde_json::from_str(&raw)?;
        calibration.validate()?;
        info!(
            path = %path.display(),
            fx = calibration.fx(),
            fy = calibration.fy(),
            "Loaded camera calibration"
        );
        Ok(calibration)
    }

    /// Write the calibration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Reject matrices that cannot be inverted
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.fx().abs() < f64::EPSILON || self.fy().abs() < f64::EPSILON {
            return Err(CalibrationError::Singular);
        }
        Ok(())
    }

    pub fn fx(&self) -> f64 {
        self.camera_matrix[0][0]
    }

    pub fn fy(&self) -> f64 {
        self.camera_matrix[1][1]
    }

    pub fn cx(&self) -> f64 {
        self.camera_matrix[0][2]
    }

    pub fn cy(&self) -> f64 {
        self.camera_matrix[1][2]
    }

    /// True when every distortion coefficient is zero
    pub fn is_distortion_free(&self) -> bool {
        self.dist_coeffs.iter().all(|c| *c == 0.0)
    }

    /// Apply the distortion model to a normalized image point
    pub fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let [k1, k2, p1, p2, k3] = self.dist_coeffs;
        let r2 = x * x + y * y;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
        let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        (xd, yd)
    }
}
