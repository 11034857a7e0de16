//! Still-image camera: frames staged on disk.
//!
//! Kiosks and terminals without a V4L/AVFoundation binding drop captured
//! frames into a file or directory; this device serves them as the live
//! feed. A directory is read in file-name order and cycled.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, trace, warn};

use super::{VideoConstraints, VideoDevice};
use crate::error::DeviceError;
use crate::image_ops;

/// Camera backed by an image file or a directory of image files.
#[derive(Debug)]
pub struct ImageFileCamera {
    source: PathBuf,
    label: String,
    frames: Vec<PathBuf>,
    cursor: usize,
    open: bool,
}

impl ImageFileCamera {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let label = format!("file:{}", source.display());
        Self {
            source,
            label,
            frames: Vec::new(),
            cursor: 0,
            open: false,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Frame files discovered at open time.
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    fn discover(&self) -> Result<Vec<PathBuf>, DeviceError> {
        if self.source.is_file() {
            return Ok(vec![self.source.clone()]);
        }
        if !self.source.is_dir() {
            return Err(DeviceError::camera_unavailable(format!(
                "no capture source at {}",
                self.source.display()
            )));
        }

        let entries = std::fs::read_dir(&self.source)
            .map_err(|e| DeviceError::camera_unavailable(e.to_string()))?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && image_ops::is_frame_file(path))
            .collect();
        frames.sort();
        Ok(frames)
    }
}

impl VideoDevice for ImageFileCamera {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self, constraints: &VideoConstraints) -> Result<(), DeviceError> {
        trace!(?constraints, source = %self.source.display(), "Opening file camera");
        let frames = self.discover()?;
        if frames.is_empty() {
            return Err(DeviceError::camera_unavailable(format!(
                "no image frames in {}",
                self.source.display()
            )));
        }
        debug!(frames = frames.len(), "File camera opened");
        self.frames = frames;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<RgbImage, DeviceError> {
        if !self.open {
            return Err(DeviceError::camera_unavailable("device is closed"));
        }
        let path = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);

        let data = tokio::fs::read(&path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Frame read failed");
            DeviceError::camera_unavailable(format!("{}: {e}", path.display()))
        })?;
        let img = image::load_from_memory(&data).map_err(|e| {
            DeviceError::encoding_failed(format!("{}: {e}", path.display()))
        })?;
        trace!(path = %path.display(), "Frame read");
        Ok(img.to_rgb8())
    }

    fn close(&mut self) {
        self.open = false;
        self.frames.clear();
        self.cursor = 0;
    }
}
