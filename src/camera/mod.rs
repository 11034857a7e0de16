//! Camera capture: device abstraction, snapshots, and the snapshot collection.
//!
//! [`VideoDevice`] abstracts over real capture sources and mocks, so the
//! orchestrator never cares where frames come from.
//! [`CameraController`] owns exactly one device handle and the ordered
//! snapshot collection.
//!
//! # Resource rules
//!
//! - The device is opened by [`CameraController::start`] (idempotent) and
//!   closed by [`CameraController::stop`] (idempotent). Dropping the
//!   controller always stops it.
//! - Every [`Snapshot`] owns a [`PreviewHandle`]; removing or clearing
//!   snapshots releases their handles before the call returns.

mod file;
pub mod mock;
mod preview;

pub use file::ImageFileCamera;
pub use preview::{PreviewHandle, PreviewRegistry};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::error::DeviceError;
use crate::image_ops::{self, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_WIDTH};

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front camera, towards the person being verified.
    #[default]
    User,
    Environment,
}

/// What the controller asks of a device when opening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing: Facing,
    /// Always false: capture never opens an audio track.
    pub audio: bool,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing: Facing::User,
            audio: false,
        }
    }
}

/// Core video device operations.
///
/// # Implementation Notes
///
/// - `open` must fail with `CameraUnavailable` when access is denied or no
///   device exists.
/// - `read_frame` returns the current frame; a zero-sized frame means the
///   device is not ready yet.
/// - `close` must be safe to call on an already-closed device.
#[allow(async_fn_in_trait)]
pub trait VideoDevice {
    /// Human-readable device label for logs.
    fn label(&self) -> &str;

    fn is_open(&self) -> bool;

    async fn open(&mut self, constraints: &VideoConstraints) -> Result<(), DeviceError>;

    async fn read_frame(&mut self) -> Result<RgbImage, DeviceError>;

    fn close(&mut self);
}

/// Encoding settings for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Frames wider than this are downscaled before encoding.
    pub max_width: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// An encoded still image plus its preview address.
#[derive(Debug)]
pub struct Snapshot {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    digest: String,
    captured_at: DateTime<Utc>,
    preview: PreviewHandle,
}

impl Snapshot {
    /// Encoded JPEG bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Hex SHA-256 of the encoded bytes.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[must_use]
    pub const fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Upload file name, e.g. `snap_1718000000123.jpg`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("snap_{}.jpg", self.captured_at.timestamp_millis())
    }

    /// Serializable summary without the image bytes.
    #[must_use]
    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            preview: self.preview.url(),
            width: self.width,
            height: self.height,
            size_bytes: self.bytes.len(),
            sha256: self.digest.clone(),
            captured_at: self.captured_at,
        }
    }
}

/// Summary of a snapshot for listings.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub preview: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub sha256: String,
    pub captured_at: DateTime<Utc>,
}

/// A burst that stopped early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("burst stopped after {captured} capture(s): {error}")]
pub struct BurstFailure {
    /// Snapshots added to the collection before the failure.
    pub captured: usize,
    pub error: DeviceError,
}

/// Owner of the video device and the snapshot collection.
pub struct CameraController<V: VideoDevice> {
    device: V,
    constraints: VideoConstraints,
    settings: CaptureSettings,
    previews: PreviewRegistry,
    collection: Vec<Snapshot>,
}

impl<V: VideoDevice> CameraController<V> {
    pub fn new(device: V, settings: CaptureSettings) -> Self {
        Self {
            device,
            constraints: VideoConstraints::default(),
            settings,
            previews: PreviewRegistry::new(),
            collection: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: VideoConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub const fn device(&self) -> &V {
        &self.device
    }

    pub const fn settings(&self) -> CaptureSettings {
        self.settings
    }

    pub const fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn is_started(&self) -> bool {
        self.device.is_open()
    }

    // === Device lifecycle ===

    /// Open the device. Calling while already started does nothing.
    #[instrument(skip(self), fields(device = self.device.label()))]
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        if self.device.is_open() {
            debug!("Camera already started");
            return Ok(());
        }
        let constraints = VideoConstraints {
            audio: false,
            ..self.constraints
        };
        self.device.open(&constraints).await.map_err(|e| {
            warn!(error = %e, "Camera start failed");
            DeviceError::camera_unavailable(e.message)
        })?;
        info!("Camera started");
        Ok(())
    }

    /// Release the device. Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.device.is_open() {
            self.device.close();
            info!(device = self.device.label(), "Camera stopped");
        }
    }

    // === Capture ===

    /// Read, downscale and encode the current frame.
    #[instrument(skip(self))]
    pub async fn capture_frame(&mut self) -> Result<Snapshot, DeviceError> {
        if !self.device.is_open() {
            return Err(DeviceError::camera_unavailable("camera has not been started"));
        }
        let frame = self.device.read_frame().await?;
        let (bytes, width, height) =
            image_ops::encode_frame(&frame, self.settings.max_width, self.settings.jpeg_quality)?;

        let digest = hex::encode(Sha256::digest(&bytes));
        let bytes: Arc<[u8]> = Arc::from(bytes);
        let preview = self.previews.create(Arc::clone(&bytes));
        debug!(width, height, size = bytes.len(), sha256 = %digest, "Frame captured");

        Ok(Snapshot {
            bytes,
            width,
            height,
            digest,
            captured_at: Utc::now(),
            preview,
        })
    }

    // === Collection ===

    /// Capture a frame and append it to the collection.
    pub async fn add_to_collection(&mut self) -> Result<&Snapshot, DeviceError> {
        let snapshot = self.capture_frame().await?;
        self.collection.push(snapshot);
        debug!(count = self.collection.len(), "Snapshot added");
        Ok(&self.collection[self.collection.len() - 1])
    }

    /// Remove the snapshot at `index`, releasing its preview.
    ///
    /// Returns false if `index` is out of range.
    pub fn remove_from_collection(&mut self, index: usize) -> bool {
        if index >= self.collection.len() {
            return false;
        }
        // The removed snapshot is dropped here, before returning.
        drop(self.collection.remove(index));
        debug!(index, remaining = self.collection.len(), "Snapshot removed");
        true
    }

    /// Drop every snapshot, releasing all previews. Returns how many were removed.
    pub fn clear_collection(&mut self) -> usize {
        let removed = self.collection.len();
        self.collection.clear();
        debug!(removed, "Snapshot collection cleared");
        removed
    }

    /// Capture `count` frames `interval` apart, appending each one.
    pub async fn capture_burst(
        &mut self,
        count: usize,
        interval: Duration,
    ) -> Result<usize, BurstFailure> {
        self.capture_burst_with(count, interval, |_, _| {}).await
    }

    /// Like [`Self::capture_burst`], calling `on_capture(index, snapshot)`
    /// after each successful capture.
    ///
    /// On failure the snapshots captured so far stay in the collection.
    #[instrument(skip(self, on_capture), fields(interval_ms = interval.as_millis()))]
    pub async fn capture_burst_with<F>(
        &mut self,
        count: usize,
        interval: Duration,
        mut on_capture: F,
    ) -> Result<usize, BurstFailure>
    where
        F: FnMut(usize, &Snapshot),
    {
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(interval).await;
            }
            match self.add_to_collection().await {
                Ok(snapshot) => on_capture(i, snapshot),
                Err(error) => {
                    warn!(captured = i, error = %error, "Burst aborted");
                    return Err(BurstFailure { captured: i, error });
                }
            }
        }
        info!(count, total = self.collection.len(), "Burst complete");
        Ok(count)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.collection
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// First snapshot in insertion order.
    pub fn first(&self) -> Option<&Snapshot> {
        self.collection.first()
    }

    /// Most recently captured snapshot.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.collection.last()
    }
}

impl<V: VideoDevice> Drop for CameraController<V> {
    fn drop(&mut self) {
        self.stop();
    }
}
