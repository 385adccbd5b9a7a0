//! Lane overlay drawing

use camera_capture::VideoFrame;
use camera_model::PerspectiveWarp;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use crate::config::OverlayConfig;

/// Paint the lane between `left` and `right` (bird's-eye `(x, y)` points,
/// top to bottom) onto a copy of the ROI.
///
/// The area between the lines is filled and the lines themselves stroked in
/// the bird's-eye view, projected back onto the ROI and blended in wherever
/// the projection left a non-black pixel.
pub fn draw_lane(
    roi: &VideoFrame,
    warp: &PerspectiveWarp,
    left: &[(f64, f64)],
    right: &[(f64, f64)],
    config: &OverlayConfig,
) -> VideoFrame {
    let (width, height) = warp.warped_dimensions();
    let mut bird = RgbImage::new(width, height);

    let polygon = lane_polygon(left, right);
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut bird, &polygon, Rgb(config.fill_color));
    }
    for line in [left, right] {
        draw_thick_polyline(&mut bird, line, config.edge_thickness, Rgb(config.edge_color));
    }

    let projected = warp.unwarp_rgb(&bird, roi.width, roi.height);
    blend(roi, &projected, config.alpha)
}

/// Closed outline: down the left line, back up the right one
fn lane_polygon(left: &[(f64, f64)], right: &[(f64, f64)]) -> Vec<Point<i32>> {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(left.len() + right.len());
    for &(x, y) in left.iter().chain(right.iter().rev()) {
        let point = Point::new(x.round() as i32, y.round() as i32);
        if polygon.last() != Some(&point) {
            polygon.push(point);
        }
    }
    // draw_polygon_mut closes the outline itself and panics on a repeated end point
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    polygon
}

fn draw_thick_polyline(image: &mut RgbImage, line: &[(f64, f64)], thickness: u32, color: Rgb<u8>) {
    let half = (thickness / 2) as i32;
    for pair in line.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        for dx in -half..=half {
            let dx = dx as f32;
            draw_line_segment_mut(image, (x0 as f32 + dx, y0 as f32), (x1 as f32 + dx, y1 as f32), color);
        }
    }
}

fn blend(roi: &VideoFrame, overlay: &RgbImage, alpha: f32) -> VideoFrame {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = roi.clone();
    for (dst, src) in out.data.chunks_exact_mut(3).zip(overlay.pixels()) {
        if src.0 == [0, 0, 0] {
            continue;
        }
        for (d, s) in dst.iter_mut().zip(src.0) {
            *d = (f32::from(*d) * (1.0 - alpha) + f32::from(s) * alpha).round() as u8;
        }
    }
    out
}
