//! Video frame types and processing

use image::RgbImage;

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a black frame
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self::new(vec![0; len], width, height, 0, 0)
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Copy into an `image` buffer
    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CameraError::Format(format!(
                "{} bytes do not match {}x{} RGB",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }

    /// Check that the buffer length matches the dimensions
    pub fn is_consistent(&self) -> bool {
        self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// Byte offset of pixel (x, y), without bounds checks
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.offset(x, y);
        match self.data.get(idx..idx + 3)? {
            &[r, g, b] => Some([r, g, b]),
            _ => None,
        }
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if !fits(x, w, self.width) || !fits(y, h, self.height) {
            return None;
        }

        let row_bytes = w as usize * 3;
        let mut cropped = Vec::with_capacity(row_bytes * h as usize);
        for row in y..(y + h) {
            let start = self.offset(x, row);
            cropped.extend_from_slice(self.data.get(start..start + row_bytes)?);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Write `patch` back at (x, y); the inverse of [`VideoFrame::crop`]
    pub fn paste(&mut self, x: u32, y: u32, patch: &VideoFrame) -> Result<(), CameraError> {
        if !fits(x, patch.width, self.width) || !fits(y, patch.height, self.height) {
            return Err(CameraError::Format(format!(
                "{}x{} patch at ({}, {}) exceeds {}x{} frame",
                patch.width, patch.height, x, y, self.width, self.height
            )));
        }
        if !self.is_consistent() || !patch.is_consistent() {
            return Err(CameraError::Format(format!(
                "buffer sizes {} and {} do not match their dimensions",
                self.data.len(),
                patch.data.len()
            )));
        }

        let row_bytes = patch.width as usize * 3;
        for row in 0..patch.height {
            let src = patch.offset(0, row);
            let dst = self.offset(x, y + row);
            self.data[dst..dst + row_bytes].copy_from_slice(&patch.data[src..src + row_bytes]);
        }
        Ok(())
    }
}

/// Whether `[start, start + len)` lies inside `[0, limit)`
fn fits(start: u32, len: u32, limit: u32) -> bool {
    start.checked_add(len).is_some_and(|end| end <= limit)
}
