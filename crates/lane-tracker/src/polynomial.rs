//! Second-order lane polynomials

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::LanePixels;

/// Radius reported for (nearly) straight lanes, in meters
pub const MAX_RADIUS_M: f64 = 10_000.0;

/// Lane boundary `x = a*y^2 + b*y + c` in bird's-eye pixel coordinates (y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl LaneFit {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Least-squares fit of x as a function of y.
    ///
    /// Returns `None` for fewer than three pixels or when the pixels do not
    /// determine a parabola (e.g. all on one row).
    pub fn fit(pixels: &LanePixels) -> Option<Self> {
        let n = pixels.len();
        if n < 3 {
            return None;
        }

        // Fit against y / scale to keep the normal equations well conditioned
        let scale = pixels.ys.iter().fold(1.0f64, |acc, y| acc.max(y.abs()));
        let design = Array2::from_shape_fn((n, 3), |(i, j)| {
            let y = pixels.ys[i] / scale;
            match j {
                0 => y * y,
                1 => y,
                _ => 1.0,
            }
        });
        let target = Array1::from(pixels.xs.clone());

        let normal = design.t().dot(&design);
        let rhs = design.t().dot(&target);

        let system = Matrix3::from_fn(|r, c| normal[[r, c]]);
        let lu = system.lu();
        // Rank-deficient systems (e.g. all pixels on one row) have no unique parabola
        if lu.determinant().abs() <= 1e-12 * system.amax().powi(3) {
            return None;
        }
        let solution = lu.solve(&Vector3::new(rhs[0], rhs[1], rhs[2]))?;
        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }

        Some(Self {
            a: solution[0] / (scale * scale),
            b: solution[1] / scale,
            c: solution[2],
        })
    }

    /// x position at row `y`
    #[inline]
    pub fn x_at(&self, y: f64) -> f64 {
        (self.a * y + self.b) * y + self.c
    }

    /// `(x, y)` for every row of a `height`-row image
    pub fn points(&self, height: u32) -> Vec<(f64, f64)> {
        (0..height)
            .map(|y| {
                let y = f64::from(y);
                (self.x_at(y), y)
            })
            .collect()
    }

    /// Radius of curvature in meters at pixel row `y`
    pub fn radius_of_curvature(&self, y: f64, scale_x: f64, scale_y: f64) -> f64 {
        let a = self.a * scale_x / (scale_y * scale_y);
        let b = self.b * scale_x / scale_y;
        if a.abs() < f64::EPSILON {
            return MAX_RADIUS_M;
        }
        let slope = 2.0 * a * y * scale_y + b;
        let radius = (1.0 + slope * slope).powf(1.5) / (2.0 * a).abs();
        radius.min(MAX_RADIUS_M)
    }

    /// Coefficient-wise mean
    pub fn mean<'a>(fits: impl IntoIterator<Item = &'a LaneFit>) -> Option<Self> {
        let (sum, count) = fits.into_iter().fold(
            (LaneFit::new(0.0, 0.0, 0.0), 0usize),
            |(acc, n), f| (LaneFit::new(acc.a + f.a, acc.b + f.b, acc.c + f.c), n + 1),
        );
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Self::new(sum.a / n, sum.b / n, sum.c / n))
    }
}
