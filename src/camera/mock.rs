//! Mock video device for unit testing.
//!
//! Records every operation and supports error injection. Clones share
//! state, so a test can hand one clone to a controller and keep another
//! for assertions.
//!
//! # Example
//!
//! ```rust,ignore
//! use attend::camera::mock::{MockVideoDevice, VideoOp};
//! use attend::camera::{CameraController, CaptureSettings};
//!
//! let device = MockVideoDevice::new(1280, 720);
//! let mut camera = CameraController::new(device.clone(), CaptureSettings::default());
//! camera.start().await?;
//! camera.capture_frame().await?;
//!
//! device.assert_operations(&[VideoOp::Open, VideoOp::ReadFrame]);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgb, RgbImage};
use tracing::{debug, trace};

use super::{VideoConstraints, VideoDevice};
use crate::error::DeviceError;

/// Recorded operation for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOp {
    Open,
    ReadFrame,
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    operations: Vec<VideoOp>,
    constraints: Vec<VideoConstraints>,
    frames_served: usize,
    fail_after_frames: Option<usize>,
    injected: Option<DeviceError>,
    frame_delay: Duration,
}

/// Mock camera producing solid-colour frames of a fixed size.
#[derive(Debug, Clone)]
pub struct MockVideoDevice {
    width: u32,
    height: u32,
    open: Arc<AtomicBool>,
    denied: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
}

impl MockVideoDevice {
    /// Mock serving `width` x `height` frames. `(0, 0)` simulates a device
    /// that never becomes ready.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        debug!(width, height, "Creating mock video device");
        Self {
            width,
            height,
            open: Arc::new(AtomicBool::new(false)),
            denied: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    // === Configuration ===

    /// Make every `open` fail as if the user refused camera access.
    pub fn deny_access(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    /// Serve `n` frames successfully, then fail every further read.
    pub fn fail_after_frames(&self, n: usize) {
        self.state.lock().unwrap().fail_after_frames = Some(n);
    }

    /// Inject an error for the next frame read.
    pub fn inject_error(&self, error: DeviceError) {
        self.state.lock().unwrap().injected = Some(error);
    }

    /// Wait this long inside every frame read.
    pub fn set_frame_delay(&self, delay: Duration) {
        self.state.lock().unwrap().frame_delay = delay;
    }

    // === Assertions ===

    /// All recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<VideoOp> {
        self.state.lock().unwrap().operations.clone()
    }

    /// How many times `op` was performed.
    #[must_use]
    pub fn count(&self, op: &VideoOp) -> usize {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|o| *o == op)
            .count()
    }

    /// Constraints passed to the most recent `open`.
    #[must_use]
    pub fn last_constraints(&self) -> Option<VideoConstraints> {
        self.state.lock().unwrap().constraints.last().copied()
    }

    /// Assert exactly these operations were performed.
    ///
    /// # Panics
    ///
    /// Panics if the operations don't match.
    pub fn assert_operations(&self, expected: &[VideoOp]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "Operation mismatch.\nExpected: {expected:#?}\nActual: {actual:#?}",
        );
    }

    /// Assert the device was never touched.
    ///
    /// # Panics
    ///
    /// Panics if any operations were recorded.
    pub fn assert_no_operations(&self) {
        let ops = self.operations();
        assert!(ops.is_empty(), "Expected no operations, but found: {ops:#?}");
    }

    fn record_op(&self, op: VideoOp) {
        trace!(?op, "Recording operation");
        self.state.lock().unwrap().operations.push(op);
    }
}

impl VideoDevice for MockVideoDevice {
    fn label(&self) -> &str {
        "mock"
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&mut self, constraints: &VideoConstraints) -> Result<(), DeviceError> {
        self.record_op(VideoOp::Open);
        self.state.lock().unwrap().constraints.push(*constraints);
        if self.denied.load(Ordering::SeqCst) {
            return Err(DeviceError::permission_denied("mock camera access denied"));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<RgbImage, DeviceError> {
        self.record_op(VideoOp::ReadFrame);
        let delay = self.state.lock().unwrap().frame_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.injected.take() {
            return Err(error);
        }
        if state.fail_after_frames.is_some_and(|limit| state.frames_served >= limit) {
            return Err(DeviceError::camera_unavailable("mock frame limit reached"));
        }
        state.frames_served += 1;
        #[allow(clippy::cast_possible_truncation)]
        let shade = (state.frames_served % 256) as u8;
        Ok(RgbImage::from_pixel(self.width, self.height, Rgb([shade, 128, 64])))
    }

    fn close(&mut self) {
        self.record_op(VideoOp::Close);
        self.open.store(false, Ordering::SeqCst);
    }
}
