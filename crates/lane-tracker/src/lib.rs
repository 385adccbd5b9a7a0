//! Lane Tracker
//!
//! Finds one lane boundary in a bird's-eye binary mask and follows it over
//! time:
//! - Histogram-seeded sliding window search when a lane has no history
//! - Corridor search around the smoothed fit while it is tracked
//! - Moving average of recent second-order fits
//! - Loss-of-track recovery after a run of missed frames

pub mod config;
pub mod polynomial;
pub mod search;
pub mod tracker;

pub use config::LaneConfig;
pub use polynomial::{LaneFit, MAX_RADIUS_M};
pub use search::{base_histogram, corridor_search, sliding_window_search, LanePixels, LaneSide};
pub use tracker::{LaneReport, LaneTracker, TrackingState};
