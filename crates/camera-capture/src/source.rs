//! Frame sources backed by still images on disk

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

/// File extensions accepted as frames
const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Anything that yields decoded frames in order
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

/// Ordered sequence of image files treated as a video stream
#[derive(Debug)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    position: usize,
    frame_interval_ns: u64,
}

impl ImageSequence {
    /// Open a single image or a directory of images (sorted by file name)
    pub fn open(path: impl AsRef<Path>, fps: u32) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_frame_file(p))
                .collect();
            paths.sort();
            paths
        } else if is_frame_file(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(CameraError::Open(format!(
                "{} is neither a directory nor a jpg/png image",
                path.display()
            )));
        };

        if paths.is_empty() {
            return Err(CameraError::Open(format!("no frames found in {}", path.display())));
        }

        info!(source = %path.display(), frames = paths.len(), fps, "Opened image sequence");

        Ok(Self::from_paths(paths, fps))
    }

    /// Build a sequence from an explicit list of files
    pub fn from_paths(paths: Vec<PathBuf>, fps: u32) -> Self {
        Self {
            paths,
            position: 0,
            frame_interval_ns: 1_000_000_000 / u64::from(fps.max(1)),
        }
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path of the frame most recently returned
    pub fn current_path(&self) -> Option<&Path> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.paths.get(i))
            .map(PathBuf::as_path)
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.paths.get(self.position) else {
            return Ok(None);
        };

        let image = image::open(path)
            .map_err(|e| CameraError::Decode(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        let sequence = self.position as u32;
        debug!(path = %path.display(), sequence, "Decoded frame");

        self.position += 1;
        Ok(Some(VideoFrame::from_rgb_image(
            image,
            u64::from(sequence) * self.frame_interval_ns,
            sequence,
        )))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
