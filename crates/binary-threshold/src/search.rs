//! Adaptive R/V threshold search

use camera_capture::VideoFrame;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::ThresholdConfig;

/// Mask value for foreground pixels
pub const FOREGROUND: u8 = 255;

/// Why a search ended without reaching the target band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdFailure {
    /// Ran out of iterations
    Bailout,
    /// Both thresholds left their allowed ranges
    OutOfRange,
}

/// Result of thresholding one ROI
#[derive(Debug, Clone)]
pub struct ThresholdOutcome {
    /// 0/255 mask with the ROI dimensions
    pub mask: GrayImage,
    /// Failure reason, `None` when the band was reached
    pub failure: Option<ThresholdFailure>,
    /// Red threshold that produced `mask`
    pub r_threshold: i32,
    /// Value threshold that produced `mask`
    pub v_threshold: i32,
    /// Number of nudges performed
    pub iterations: u32,
    /// Foreground pixels / total pixels of `mask`
    pub foreground_fraction: f64,
}

impl ThresholdOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Per-pixel R and V planes of an RGB frame
struct Channels {
    r: Vec<u8>,
    v: Vec<u8>,
}

impl Channels {
    fn from_frame(frame: &VideoFrame) -> Self {
        let (r, v) = frame
            .data
            .chunks_exact(3)
            .map(|px| (px[0], px[0].max(px[1]).max(px[2])))
            .unzip();
        Self { r, v }
    }

    fn count(&self, r_t: i32, v_t: i32) -> usize {
        self.r
            .iter()
            .zip(&self.v)
            .filter(|&(&r, &v)| is_foreground(r, v, r_t, v_t))
            .count()
    }

    fn mask(&self, width: u32, height: u32, r_t: i32, v_t: i32) -> GrayImage {
        let raw = self
            .r
            .iter()
            .zip(&self.v)
            .map(|(&r, &v)| if is_foreground(r, v, r_t, v_t) { FOREGROUND } else { 0 })
            .collect();
        GrayImage::from_raw(width, height, raw).unwrap_or_else(|| GrayImage::new(width, height))
    }
}

#[inline]
fn is_foreground(r: u8, v: u8, r_t: i32, v_t: i32) -> bool {
    i32::from(v) >= v_t || i32::from(r) >= r_t
}

/// Threshold search that remembers the last good thresholds between frames
#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    config: ThresholdConfig,
    r_best: i32,
    v_best: i32,
}

impl AdaptiveThreshold {
    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            r_best: config.r_init,
            v_best: config.v_init,
            config,
        }
    }

    /// Thresholds the next frame starts from
    pub fn best(&self) -> (i32, i32) {
        (self.r_best, self.v_best)
    }

    /// Forget carried-over thresholds
    pub fn reset(&mut self) {
        self.r_best = self.config.r_init;
        self.v_best = self.config.v_init;
    }

    /// Threshold `roi`, nudging R and V until the foreground fraction lands
    /// in `[min_lane_fraction, max_lane_fraction)`.
    pub fn apply(&mut self, roi: &VideoFrame) -> ThresholdOutcome {
        let cfg = &self.config;
        let channels = Channels::from_frame(roi);
        let total = channels.r.len();
        let min_area = cfg.min_lane_fraction * total as f64;
        let max_area = cfg.max_lane_fraction * total as f64;
        let out_of_band = |count: usize| {
            let count = count as f64;
            count < min_area || count >= max_area
        };

        let (mut r_t, mut v_t) = (self.r_best, self.v_best);
        let mut count = channels.count(r_t, v_t);
        let mut iterations = 0u32;
        let mut step_reduction = 0;
        let mut failure = None;

        while total > 0 && out_of_band(count) {
            iterations += 1;
            if iterations == cfg.bailout / 2 {
                step_reduction = cfg.fine_step_reduction;
            }
            if iterations >= cfg.bailout {
                failure = Some(ThresholdFailure::Bailout);
                break;
            }

            let v_free = cfg.v_range.contains(v_t);
            let r_free = cfg.r_range.contains(r_t);
            if !v_free && !r_free {
                failure = Some(ThresholdFailure::OutOfRange);
                break;
            }

            // Too few pixels: lower thresholds. Too many: raise them.
            let direction = if (count as f64) < min_area { -1 } else { 1 };
            if v_free {
                v_t += direction * (cfg.v_range.step - step_reduction).max(1);
            }
            if r_free {
                r_t += direction * (cfg.r_range.step - step_reduction).max(1);
            }

            count = channels.count(r_t, v_t);
            trace!(iterations, r_t, v_t, fraction = count as f64 / total as f64, "Threshold nudge");
        }

        if total == 0 {
            failure = Some(ThresholdFailure::OutOfRange);
        }

        let foreground_fraction = if total > 0 { count as f64 / total as f64 } else { 0.0 };

        match failure {
            None => {
                self.r_best = r_t;
                self.v_best = v_t;
                debug!(r_t, v_t, iterations, foreground_fraction, "Threshold search converged");
            }
            Some(reason) => {
                self.reset();
                warn!(?reason, iterations, foreground_fraction, "Threshold search failed, resetting");
            }
        }

        ThresholdOutcome {
            mask: channels.mask(roi.width, roi.height, r_t, v_t),
            failure,
            r_threshold: r_t,
            v_threshold: v_t,
            iterations,
            foreground_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThresholdRange;
    use proptest::prelude::*;

    /// 100x10 frame: `bright` pixels at brightness `level`, the rest dark grey
    fn frame_with(levels: &[(u8, usize)]) -> VideoFrame {
        let mut data = Vec::with_capacity(1000 * 3);
        for &(level, n) in levels {
            for _ in 0..n {
                data.extend_from_slice(&[level, level, level]);
            }
        }
        let filled = data.len() / 3;
        for _ in filled..1000 {
            data.extend_from_slice(&[60, 60, 60]);
        }
        VideoFrame::new(data, 100, 10, 0, 0)
    }

    #[test]
    fn test_in_band_on_first_try() {
        // 2% of pixels at 200 -> in [1.5%, 3%)
        let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
        let out = bt.apply(&frame_with(&[(200, 20)]));

        assert!(out.success());
        assert_eq!(out.iterations, 0);
        assert_eq!((out.r_threshold, out.v_threshold), (150, 150));
        assert!((out.foreground_fraction - 0.02).abs() < 1e-9);
        assert_eq!(out.mask.pixels().filter(|p| p.0[0] == FOREGROUND).count(), 20);
    }

    #[test]
    fn test_raises_thresholds_when_too_bright() {
        // 10% at 160 would swamp the mask; 2% at 220 are the real lanes
        let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
        let out = bt.apply(&frame_with(&[(220, 20), (160, 80)]));

        assert!(out.success());
        assert!(out.r_threshold > 160 && out.v_threshold > 160);
        assert_eq!(bt.best(), (out.r_threshold, out.v_threshold));
    }

    #[test]
    fn test_lowers_thresholds_when_too_dark() {
        let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
        let out = bt.apply(&frame_with(&[(142, 20)]));

        assert!(out.success());
        assert!(out.r_threshold <= 142);
        assert_eq!(out.mask.pixels().filter(|p| p.0[0] == FOREGROUND).count(), 20);
    }

    #[test]
    fn test_carries_thresholds_between_frames() {
        let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
        let frame = frame_with(&[(220, 20), (160, 80)]);
        let first = bt.apply(&frame);
        let second = bt.apply(&frame);

        assert!(first.iterations > 0);
        assert_eq!(second.iterations, 0);
        assert_eq!(second.r_threshold, first.r_threshold);
    }

    #[test]
    fn test_out_of_range_failure_resets() {
        // Every pixel is saturated: no threshold in range can thin it out
        let mut bt = AdaptiveThreshold::new(ThresholdConfig {
            bailout: 200,
            ..Default::default()
        });
        let out = bt.apply(&frame_with(&[(255, 1000)]));

        assert_eq!(out.failure, Some(ThresholdFailure::OutOfRange));
        assert_eq!(bt.best(), (150, 150));
        assert_eq!(out.mask.dimensions(), (100, 10));
    }

    #[test]
    fn test_bailout_failure() {
        let mut bt = AdaptiveThreshold::new(ThresholdConfig {
            r_range: ThresholdRange::new(0, 255, 1),
            v_range: ThresholdRange::new(0, 255, 1),
            bailout: 4,
            fine_step_reduction: 0,
            ..Default::default()
        });
        let out = bt.apply(&frame_with(&[(255, 1000)]));

        assert_eq!(out.failure, Some(ThresholdFailure::Bailout));
        assert_eq!(out.iterations, 4);
        assert_eq!(bt.best(), (150, 150));
    }

    #[test]
    fn test_fine_steps_after_half_budget() {
        let mut bt = AdaptiveThreshold::new(ThresholdConfig {
            bailout: 4,
            ..Default::default()
        });
        // Nothing is bright: thresholds walk down 5, then 2 per step from the halfway mark
        let out = bt.apply(&frame_with(&[]));
        assert_eq!(out.failure, Some(ThresholdFailure::Bailout));
        assert_eq!(out.r_threshold, 150 - 5 - 2 - 2);
    }

    #[test]
    fn test_fine_step_never_drops_below_one() {
        let mut bt = AdaptiveThreshold::new(ThresholdConfig {
            bailout: 4,
            fine_step_reduction: 10,
            ..Default::default()
        });
        let out = bt.apply(&frame_with(&[]));
        assert_eq!(out.failure, Some(ThresholdFailure::Bailout));
        assert_eq!((out.r_threshold, out.v_threshold), (150 - 5 - 1 - 1, 150 - 5 - 1 - 1));
    }

    proptest! {
        #[test]
        fn test_mask_is_binary_and_sized(seed in proptest::collection::vec(any::<u8>(), 300)) {
            let frame = VideoFrame::new(seed, 10, 10, 0, 0);
            let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
            let out = bt.apply(&frame);
            prop_assert_eq!(out.mask.dimensions(), (10, 10));
            prop_assert!(out.mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == FOREGROUND));
            if out.success() {
                prop_assert!(out.foreground_fraction >= 0.015 && out.foreground_fraction < 0.03);
            }
        }
    }
}
