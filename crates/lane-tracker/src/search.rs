//! Lane pixel search in the bird's-eye mask

use image::GrayImage;
use ndarray::{s, Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{LaneConfig, LaneFit};

/// Which boundary of the ego lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneSide {
    Left,
    Right,
}

impl LaneSide {
    /// Column range `[start, end)` of the half image this side is seeded from
    pub fn half(&self, width: u32) -> (usize, usize) {
        let mid = width as usize / 2;
        match self {
            LaneSide::Left => (0, mid),
            LaneSide::Right => (mid, width as usize),
        }
    }
}

/// Candidate lane pixel coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanePixels {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl LanePixels {
    pub fn push(&mut self, x: f64, y: f64) {
        self.xs.push(x);
        self.ys.push(y);
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Rows covered, from the topmost to the bottommost pixel
    pub fn vertical_span(&self) -> f64 {
        let (min, max) = self
            .ys
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &y| (lo.min(y), hi.max(y)));
        if self.is_empty() {
            0.0
        } else {
            max - min
        }
    }
}

/// Foreground pixel coordinates of a mask
fn foreground(mask: &GrayImage) -> Vec<(u32, u32)> {
    mask.enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Column histogram of the bottom `rows` rows of the mask
pub fn base_histogram(mask: &GrayImage, rows: u32) -> Array1<u32> {
    let (width, height) = mask.dimensions();
    let Ok(view) = ArrayView2::from_shape((height as usize, width as usize), mask.as_raw().as_slice()) else {
        return Array1::zeros(width as usize);
    };
    let rows = rows.min(height) as usize;
    view.slice(s![height as usize - rows.., ..])
        .mapv(|p| u32::from(p > 0))
        .sum_axis(Axis(0))
}

/// Histogram-seeded sliding window search.
///
/// The seed column is the histogram peak in this side's half of the image;
/// windows then walk from the bottom edge upward, recentring on the mean
/// column of any window holding at least `num_white` pixels.
pub fn sliding_window_search(mask: &GrayImage, side: LaneSide, config: &LaneConfig) -> LanePixels {
    let (width, height) = mask.dimensions();
    let mut pixels = LanePixels::default();
    if width == 0 || height == 0 || config.sw_height == 0 {
        return pixels;
    }

    let histogram = base_histogram(mask, config.hist_height);
    let (start, end) = side.half(width);
    // First maximum wins on ties
    let seed = (start..end).fold(start, |best, x| {
        if histogram[x] > histogram[best] {
            x
        } else {
            best
        }
    });

    let nonzero = foreground(mask);
    let half_width = i64::from(config.sw_width);
    let mut current_x = seed as i64;
    let mut bottom = height;

    while bottom > 0 {
        let top = bottom.saturating_sub(config.sw_height);
        let (left, right) = (current_x - half_width, current_x + half_width);

        let mut count = 0usize;
        let mut sum_x = 0i64;
        for &(x, y) in &nonzero {
            let xi = i64::from(x);
            if y >= top && y < bottom && xi >= left && xi < right {
                pixels.push(f64::from(x), f64::from(y));
                count += 1;
                sum_x += xi;
            }
        }

        trace!(?side, top, bottom, current_x, count, "Sliding window");

        if count >= config.num_white && count > 0 {
            current_x = sum_x / count as i64;
        }
        bottom = top;
    }

    pixels
}

/// Foreground pixels within `search_width` of `fit` on their row
pub fn corridor_search(mask: &GrayImage, fit: &LaneFit, search_width: f64) -> LanePixels {
    let mut pixels = LanePixels::default();
    for (x, y) in foreground(mask) {
        let (x, y) = (f64::from(x), f64::from(y));
        if (x - fit.x_at(y)).abs() < search_width {
            pixels.push(x, y);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// 640x240 mask with a 5px stroke following `x(y)`
    fn mask_with_lines(lines: &[&dyn Fn(f64) -> f64]) -> GrayImage {
        let mut mask = GrayImage::new(640, 240);
        for line in lines {
            for y in 0..240u32 {
                let cx = line(f64::from(y)).round() as i64;
                for x in (cx - 2)..=(cx + 2) {
                    if (0..640).contains(&x) {
                        mask.put_pixel(x as u32, y, Luma([255]));
                    }
                }
            }
        }
        mask
    }

    #[test]
    fn test_histogram_counts_bottom_rows() {
        let mask = mask_with_lines(&[&|_: f64| 100.0]);
        let hist = base_histogram(&mask, 100);
        assert_eq!(hist.len(), 640);
        assert_eq!(hist[100], 100);
        assert_eq!(hist[300], 0);
    }

    #[test]
    fn test_sliding_window_finds_both_sides() {
        let mask = mask_with_lines(&[&|_: f64| 150.0, &|_: f64| 480.0]);
        let config = LaneConfig::default();

        let left = sliding_window_search(&mask, LaneSide::Left, &config);
        let right = sliding_window_search(&mask, LaneSide::Right, &config);

        assert_eq!(left.len(), 240 * 5);
        assert!(left.xs.iter().all(|&x| (148.0..=152.0).contains(&x)));
        assert!(right.xs.iter().all(|&x| (478.0..=482.0).contains(&x)));
        assert_eq!(left.vertical_span(), 239.0);
    }

    #[test]
    fn test_sliding_window_follows_curve() {
        // Drifts 90px to the right over the image height
        let curve = |y: f64| 250.0 - 90.0 * (1.0 - y / 239.0).powi(2);
        let mask = mask_with_lines(&[&curve]);
        let pixels = sliding_window_search(&mask, LaneSide::Left, &LaneConfig::default());

        // Most of the stroke is collected, including the top rows
        assert!(pixels.len() > 240 * 5 * 8 / 10);
        assert!(pixels.ys.iter().any(|&y| y < 24.0));
    }

    #[test]
    fn test_corridor_search_ignores_far_pixels() {
        let mask = mask_with_lines(&[&|_: f64| 200.0, &|_: f64| 400.0]);
        let fit = LaneFit::new(0.0, 0.0, 205.0);
        let pixels = corridor_search(&mask, &fit, 50.0);

        assert_eq!(pixels.len(), 240 * 5);
        assert!(pixels.xs.iter().all(|&x| x < 260.0));
    }

    #[test]
    fn test_empty_mask_yields_nothing() {
        let mask = GrayImage::new(640, 240);
        let pixels = sliding_window_search(&mask, LaneSide::Right, &LaneConfig::default());
        assert!(pixels.is_empty());
        assert_eq!(pixels.vertical_span(), 0.0);
    }
}
