//! Recording backend for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::trace;

use super::{RawResponse, TransportError, VerificationBackend, VerificationRequest};

type Reply = Result<RawResponse, TransportError>;

/// Mock backend: records every request and answers from a script.
///
/// Unscripted requests get the default reply (`200 {"ok":true}` unless
/// changed with [`MockBackend::with_default`]).
pub struct MockBackend {
    default: Reply,
    scripted: Mutex<VecDeque<Reply>>,
    login_script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<VerificationRequest>>,
    logins: Mutex<Vec<String>>,
    delay: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default: Ok(RawResponse::new(200, r#"{"ok":true}"#)),
            scripted: Mutex::new(VecDeque::new()),
            login_script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            logins: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Answer every unscripted request with `status` and `body`.
    #[must_use]
    pub fn with_default(mut self, status: u16, body: &str) -> Self {
        self.default = Ok(RawResponse::new(status, body));
        self
    }

    /// Wait this long before answering each request.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a one-off response.
    pub fn push(&self, status: u16, body: &str) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(Ok(RawResponse::new(status, body)));
    }

    /// Queue a one-off transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.scripted.lock().unwrap().push_back(Err(error));
    }

    pub fn push_login(&self, response: RawResponse) {
        self.login_script.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_login_error(&self, error: TransportError) {
        self.login_script.lock().unwrap().push_back(Err(error));
    }

    // === Assertions ===

    #[must_use]
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<VerificationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Usernames passed to `login`, in order.
    #[must_use]
    pub fn login_calls(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }

    /// Assert no request was sent.
    ///
    /// # Panics
    ///
    /// Panics if any request was recorded.
    pub fn assert_no_requests(&self) {
        let requests = self.requests();
        assert!(requests.is_empty(), "Expected no requests, but found: {requests:#?}");
    }
}

impl VerificationBackend for MockBackend {
    async fn send(&self, request: &VerificationRequest) -> Reply {
        trace!(mode = request.mode, path = request.path, "Mock backend request");
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.scripted.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default.clone())
    }

    async fn login(&self, username: &str, _password: &str) -> Reply {
        self.logins.lock().unwrap().push(username.to_string());
        let scripted = self.login_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(RawResponse::new(401, r#"{"detail":"invalid credentials"}"#)))
    }
}
