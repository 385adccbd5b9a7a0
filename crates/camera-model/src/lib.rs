//! Camera Model
//!
//! One-time geometric setup consumed by every frame of the lane pipeline:
//! - Camera intrinsics and lens distortion loaded from a calibration file
//! - Undistortion remap
//! - Perspective warp to and from the bird's-eye road view

pub mod calibration;
pub mod undistort;
pub mod warp;

pub use calibration::CameraCalibration;
pub use undistort::Undistorter;
pub use warp::{PerspectiveWarp, WarpConfig};

use thiserror::Error;

/// Calibration and warp error types
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Failed to read calibration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse calibration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Camera matrix is singular")]
    Singular,

    #[error("Degenerate perspective warp: {0}")]
    DegenerateWarp(String),

    #[error("Frame is {actual:?}, calibration expects {expected:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
