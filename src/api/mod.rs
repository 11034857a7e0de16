//! Verification backend client.
//!
//! [`VerificationBackend`] is the transport seam: it sends an assembled
//! [`VerificationRequest`] and hands back the raw status and body. Turning
//! that into an outcome is the job of [`crate::outcome::interpret`].

pub mod http;
pub mod mock;
mod request;
mod response;

pub use http::HttpBackend;
pub use request::{
    Action, ImagePart, ImageSource, MIN_ENROLL_SNAPSHOTS, ResponseShape, SubmissionMode,
    VerificationRequest,
};
pub use response::{
    AttendanceBody, EnrollBody, ErrorBody, LoginBody, MatchedIdentity, RecognizeBody,
};

use tracing::{info, instrument, warn};

use crate::error::{AttendError, Result};

/// Status and body of an HTTP exchange that produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }
}

impl From<TransportError> for AttendError {
    fn from(e: TransportError) -> Self {
        Self::Network {
            status: None,
            message: e.message,
        }
    }
}

/// Transport to the verification backend.
#[allow(async_fn_in_trait)]
pub trait VerificationBackend {
    /// Send a verification request.
    async fn send(&self, request: &VerificationRequest) -> std::result::Result<RawResponse, TransportError>;

    /// Exchange username and password for a session token.
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<RawResponse, TransportError>;
}

impl<B: VerificationBackend + ?Sized> VerificationBackend for &B {
    async fn send(&self, request: &VerificationRequest) -> std::result::Result<RawResponse, TransportError> {
        (**self).send(request).await
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<RawResponse, TransportError> {
        (**self).login(username, password).await
    }
}

/// Log in and parse the token response.
///
/// Rejections carry the server's `detail` when present.
#[instrument(skip(backend, password))]
pub async fn login<B: VerificationBackend>(
    backend: &B,
    username: &str,
    password: &str,
) -> Result<LoginBody> {
    let response = backend.login(username, password).await?;

    if !response.is_success() {
        let reason = serde_json::from_str::<ErrorBody>(&response.body)
            .ok()
            .and_then(|b| b.reason())
            .unwrap_or_else(|| {
                if response.status == 401 {
                    "invalid credentials".to_string()
                } else {
                    "login failed".to_string()
                }
            });
        warn!(status = response.status, %reason, "Login rejected");
        return Err(AttendError::Rejected { reason });
    }

    let body: LoginBody = serde_json::from_str(&response.body).map_err(|e| AttendError::Network {
        status: Some(response.status),
        message: format!("malformed login response: {e}"),
    })?;
    info!(role = %body.role, "Logged in");
    Ok(body)
}
