//! Adaptive Binary Threshold
//!
//! Turns a road ROI into a binary lane-pixel mask. A pixel is foreground when
//! its red channel or its HSV value clears the current threshold; the two
//! thresholds are nudged until the foreground share lands in a target band,
//! and the winning pair seeds the search on the next frame.

mod config;
mod search;

pub use config::{ThresholdConfig, ThresholdRange};
pub use search::{AdaptiveThreshold, ThresholdFailure, ThresholdOutcome, FOREGROUND};
