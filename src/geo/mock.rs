//! Scriptable position source for tests.
//!
//! Records every request and how many times it was asked for a fix, so
//! tests can assert that a rejected submission never touched the device.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::trace;

use super::{PositionFault, PositionFaultCode, PositionReading, PositionRequest, PositionSource};

/// Mock position source.
pub struct MockPositionSource {
    default: Result<PositionReading, PositionFault>,
    scripted: Mutex<VecDeque<Result<PositionReading, PositionFault>>>,
    delay: Duration,
    requests: Mutex<Vec<PositionRequest>>,
}

impl MockPositionSource {
    /// Always answers with `reading`.
    #[must_use]
    pub fn fixed(reading: PositionReading) -> Self {
        Self::with_default(Ok(reading))
    }

    /// Always fails with `code`.
    #[must_use]
    pub fn failing(code: PositionFaultCode) -> Self {
        Self::with_default(Err(PositionFault::new(code, format!("mock {code:?}"))))
    }

    fn with_default(default: Result<PositionReading, PositionFault>) -> Self {
        Self {
            default,
            scripted: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Wait this long before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a one-off answer used before falling back to the default.
    pub fn push(&self, result: Result<PositionReading, PositionFault>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<PositionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of fixes requested so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PositionSource for MockPositionSource {
    async fn locate(&self, request: &PositionRequest) -> Result<PositionReading, PositionFault> {
        trace!(?request, "Mock position request");
        self.requests.lock().unwrap().push(*request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.scripted.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default.clone())
    }
}
