//! Camera Capture Library for the lane finder
//!
//! Provides the RGB frame type shared by every pipeline stage and the
//! sources that feed it:
//! - Single road images (jpg/png)
//! - Directories of dashcam frames replayed as a stream

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequence};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Streaming error: {0}")]
    Stream(String),
}
