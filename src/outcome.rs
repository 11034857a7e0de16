//! Attempt outcomes and the result interpreter.
//!
//! Every submission attempt resolves to exactly one [`AttemptOutcome`].
//! [`interpret`] classifies an HTTP status and body for a given mode; device
//! and transport failures convert directly.

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{
    Action, AttendanceBody, EnrollBody, ErrorBody, MatchedIdentity, RecognizeBody, ResponseShape,
    SubmissionMode, TransportError,
};
use crate::error::{DeviceError, DeviceErrorKind};
use crate::slot::Slot;

/// Enrollment counters returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    /// Samples accepted from this request.
    pub added: u32,
    /// Samples now stored for the identity.
    pub total: u32,
}

/// Payload of a successful attempt.
///
/// Optional fields are passed through from the server as-is: absent stays
/// absent, and zero is a real distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Success {
    /// Match confidence. Manual clocks and enrollments carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_identity: Option<MatchedIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<Enrollment>,
}

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success(Success),
    Rejected {
        reason: String,
    },
    DeviceError {
        kind: DeviceErrorKind,
        message: String,
    },
    NetworkError {
        status_code: Option<u16>,
        message: String,
    },
}

impl AttemptOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Variant name as used in JSON output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Rejected { .. } => "rejected",
            Self::DeviceError { .. } => "device_error",
            Self::NetworkError { .. } => "network_error",
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

impl From<DeviceError> for AttemptOutcome {
    fn from(e: DeviceError) -> Self {
        Self::DeviceError {
            kind: e.kind,
            message: e.message,
        }
    }
}

impl From<TransportError> for AttemptOutcome {
    fn from(e: TransportError) -> Self {
        Self::NetworkError {
            status_code: None,
            message: e.message,
        }
    }
}

/// Classified response plus the credential side-channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub outcome: AttemptOutcome,
    /// The server refused the attached credential; the session must be
    /// torn down. Never set for modes that send no credential.
    pub credential_invalid: bool,
}

impl Interpretation {
    const fn plain(outcome: AttemptOutcome) -> Self {
        Self {
            outcome,
            credential_invalid: false,
        }
    }
}

fn detail_or(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.reason())
        .unwrap_or_else(|| fallback.to_string())
}

fn parse_slot(raw: Option<&str>) -> Option<Slot> {
    let raw = raw?;
    match raw.parse::<Slot>() {
        Ok(slot) => Some(slot),
        Err(e) => {
            warn!(slot = raw, error = %e, "Ignoring unknown slot from server");
            None
        }
    }
}

fn malformed(status: u16, e: &serde_json::Error) -> AttemptOutcome {
    AttemptOutcome::NetworkError {
        status_code: Some(status),
        message: format!("malformed response body: {e}"),
    }
}

/// Classify an HTTP response for `mode`.
///
/// - 401: `Rejected`, and `credential_invalid` when the mode sent a credential.
/// - other non-2xx: `Rejected` with the server's `detail` or the mode's
///   fallback reason.
/// - 2xx with an unparseable body: `NetworkError` carrying the status.
/// - 2xx lacking the success shape: `Rejected`.
#[must_use]
pub fn interpret(mode: &SubmissionMode, status: u16, body: &str) -> Interpretation {
    let fallback = mode.fallback_reason();

    if status == 401 {
        let credential_invalid = mode.requires_credential();
        warn!(mode = mode.name(), credential_invalid, "Server answered 401");
        return Interpretation {
            outcome: AttemptOutcome::rejected(detail_or(body, fallback)),
            credential_invalid,
        };
    }

    if !(200..300).contains(&status) {
        let reason = detail_or(body, fallback);
        debug!(status, %reason, "Submission rejected");
        return Interpretation::plain(AttemptOutcome::rejected(reason));
    }

    let outcome = match mode.response_shape() {
        ResponseShape::Attendance { scored } => match serde_json::from_str::<AttendanceBody>(body) {
            Err(e) => malformed(status, &e),
            Ok(b) if !b.ok || (scored && b.score.is_none()) => {
                AttemptOutcome::rejected(detail_or(body, fallback))
            }
            Ok(b) => AttemptOutcome::Success(Success {
                match_score: b.score,
                distance_meters: b.distance_m,
                slot: parse_slot(b.slot.as_deref()),
                matched_identity: b.user,
                action: b.action.as_deref().and_then(|a| a.parse().ok()),
                attendance_id: b.attendance_id,
                enrollment: None,
            }),
        },
        ResponseShape::Recognize => match serde_json::from_str::<RecognizeBody>(body) {
            Err(e) => malformed(status, &e),
            Ok(RecognizeBody {
                found: true,
                score: Some(score),
                user,
            }) => AttemptOutcome::Success(Success {
                match_score: Some(score),
                matched_identity: user,
                ..Success::default()
            }),
            Ok(RecognizeBody {
                found: false,
                score: Some(score),
                ..
            }) => AttemptOutcome::rejected(format!("no matching identity (score={score:.2})")),
            Ok(_) => AttemptOutcome::rejected(detail_or(body, fallback)),
        },
        ResponseShape::Enroll => match serde_json::from_str::<EnrollBody>(body) {
            Err(e) => malformed(status, &e),
            Ok(EnrollBody { ok: true, added, total }) => AttemptOutcome::Success(Success {
                enrollment: Some(Enrollment {
                    added: added.unwrap_or(0),
                    total: total.unwrap_or(0),
                }),
                ..Success::default()
            }),
            Ok(_) => AttemptOutcome::rejected(detail_or(body, fallback)),
        },
    };

    debug!(mode = mode.name(), status, outcome = outcome.label(), "Response interpreted");
    Interpretation::plain(outcome)
}
