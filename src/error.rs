//! Error types for attendance capture and submission.
//!
//! Failures of a single attempt (device, network, rejection) are *outcomes*,
//! see [`crate::outcome::AttemptOutcome`]. The types here cover the rest:
//! structured device failures, caller-contract violations, and the
//! crate-level [`AttendError`] used by configuration, sessions and the CLI.

use serde::Serialize;
use thiserror::Error;

use crate::orchestrator::OrchestratorState;

/// Structured device failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    CameraUnavailable,
    EncodingFailed,
}

impl DeviceErrorKind {
    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission denied",
            Self::PositionUnavailable => "position unavailable",
            Self::Timeout => "timed out",
            Self::CameraUnavailable => "camera unavailable",
            Self::EncodingFailed => "frame encoding failed",
        }
    }
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A local device failure (camera or position).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::PermissionDenied, message)
    }

    pub fn position_unavailable(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::PositionUnavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Timeout, message)
    }

    pub fn camera_unavailable(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::CameraUnavailable, message)
    }

    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::EncodingFailed, message)
    }
}

/// The caller invoked an operation it was not allowed to invoke.
///
/// These are programming-contract errors, never transient failures; no
/// device or network call has been made when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionViolation {
    #[error("a submission is already in progress (state: {state})")]
    Busy { state: OrchestratorState },

    #[error("{mode} needs at least {required} snapshot(s), have {actual}")]
    InsufficientSnapshots {
        mode: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("{mode} requires a signed-in session")]
    MissingCredential { mode: &'static str },

    #[error("enrollment target email is empty")]
    MissingTarget,

    #[error("camera has not been started")]
    CameraNotStarted,
}

/// Primary error type for everything outside a single attempt's outcome.
#[derive(Error, Debug)]
pub enum AttendError {
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Request failed: {message}")]
    Network { status: Option<u16>, message: String },

    #[error("Rejected by server: {reason}")]
    Rejected { reason: String },

    #[error("Not signed in")]
    NotLoggedIn,

    #[error("Session expired")]
    SessionExpired,

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Image errors
    #[error("Image source not found: {path}")]
    ImageNotFound { path: String },

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AttendError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotLoggedIn
                | Self::SessionExpired
                | Self::Device(_)
                | Self::Precondition(
                    PreconditionViolation::MissingCredential { .. }
                        | PreconditionViolation::InsufficientSnapshots { .. }
                )
                | Self::Rejected { .. }
                | Self::ImageNotFound { .. }
                | Self::ConfigNotFound { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotLoggedIn
            | Self::SessionExpired
            | Self::Precondition(PreconditionViolation::MissingCredential { .. }) => {
                Some("Run: attend login <email>")
            }
            Self::Precondition(PreconditionViolation::InsufficientSnapshots { .. }) => {
                Some("Capture more frames with --count")
            }
            Self::Device(e) => match e.kind {
                DeviceErrorKind::PermissionDenied => Some("Allow location access and retry"),
                DeviceErrorKind::PositionUnavailable => {
                    Some("Pass --lat/--lng or set [position] in the config file")
                }
                DeviceErrorKind::CameraUnavailable => {
                    Some("Pass --camera <path> or set camera.source in the config file")
                }
                DeviceErrorKind::Timeout | DeviceErrorKind::EncodingFailed => None,
            },
            Self::ConfigNotFound { .. } => Some("Run: attend init"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using AttendError.
pub type Result<T> = std::result::Result<T, AttendError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| AttendError::Other(format!("{}: {e}", f().into())))
    }
}
