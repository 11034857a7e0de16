//! Submission modes and the request each one produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::PositionReading;

/// Clock direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    In,
    Out,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(format!("unknown action '{other}' (use: in|out)")),
        }
    }
}

/// Minimum snapshot count for enrollment.
pub const MIN_ENROLL_SNAPSHOTS: usize = 3;

/// Where the image for a submission comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// No image is sent.
    None,
    /// A frame captured at submit time, concurrently with the position fix.
    Fresh,
    /// The first snapshot of the collection.
    FirstInCollection,
    /// Every snapshot of the collection; at least `min` are required.
    Collection { min: usize },
}

/// Response shape a mode expects on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{ok, action, score?, distance_m, slot?, attendance_id, user}`
    Attendance { scored: bool },
    /// `{found, score, user?}`
    Recognize,
    /// `{ok, added, total}`
    Enroll,
}

/// One of the supported submission flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Authenticated clock without a face image.
    Manual(Action),
    /// Authenticated clock with a live face capture.
    LiveCapture(Action),
    /// Unauthenticated face-scan terminal.
    Kiosk(Action),
    /// Admin: identify the first snapshot of the collection.
    AdminRecognize,
    /// Admin: register the collection as face samples for `email`.
    AdminEnroll { email: String },
}

impl SubmissionMode {
    /// Short mode name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Manual(_) => "manual",
            Self::LiveCapture(_) => "live-capture",
            Self::Kiosk(_) => "kiosk",
            Self::AdminRecognize => "admin-recognize",
            Self::AdminEnroll { .. } => "admin-enroll",
        }
    }

    #[must_use]
    pub const fn action(&self) -> Option<Action> {
        match self {
            Self::Manual(a) | Self::LiveCapture(a) | Self::Kiosk(a) => Some(*a),
            Self::AdminRecognize | Self::AdminEnroll { .. } => None,
        }
    }

    /// Endpoint path under the base URL.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Manual(Action::In) => "/api/attendance/manual-in",
            Self::Manual(Action::Out) => "/api/attendance/manual-out",
            Self::LiveCapture(Action::In) => "/api/attendance/clock-in",
            Self::LiveCapture(Action::Out) => "/api/attendance/clock-out",
            Self::Kiosk(_) => "/api/attendance/anonymous-clock",
            Self::AdminRecognize => "/api/admin/recognize",
            Self::AdminEnroll { .. } => "/api/admin/enroll",
        }
    }

    /// Whether the bearer credential must be attached.
    #[must_use]
    pub const fn requires_credential(&self) -> bool {
        !matches!(self, Self::Kiosk(_))
    }

    /// Whether a fresh position fix is part of the request.
    #[must_use]
    pub const fn needs_position(&self) -> bool {
        matches!(self, Self::Manual(_) | Self::LiveCapture(_) | Self::Kiosk(_))
    }

    /// Whether the recognition threshold is sent as the `th` query parameter.
    #[must_use]
    pub const fn uses_threshold(&self) -> bool {
        matches!(self, Self::LiveCapture(_) | Self::AdminRecognize)
    }

    #[must_use]
    pub const fn image_source(&self) -> ImageSource {
        match self {
            Self::Manual(_) => ImageSource::None,
            Self::LiveCapture(_) | Self::Kiosk(_) => ImageSource::Fresh,
            Self::AdminRecognize => ImageSource::FirstInCollection,
            Self::AdminEnroll { .. } => ImageSource::Collection {
                min: MIN_ENROLL_SNAPSHOTS,
            },
        }
    }

    #[must_use]
    pub const fn response_shape(&self) -> ResponseShape {
        match self {
            Self::Manual(_) => ResponseShape::Attendance { scored: false },
            Self::LiveCapture(_) | Self::Kiosk(_) => ResponseShape::Attendance { scored: true },
            Self::AdminRecognize => ResponseShape::Recognize,
            Self::AdminEnroll { .. } => ResponseShape::Enroll,
        }
    }

    /// Rejection reason used when the server gives no `detail`.
    #[must_use]
    pub const fn fallback_reason(&self) -> &'static str {
        match self {
            Self::Manual(Action::In) | Self::LiveCapture(Action::In) | Self::Kiosk(Action::In) => {
                "clock-in failed"
            }
            Self::Manual(Action::Out)
            | Self::LiveCapture(Action::Out)
            | Self::Kiosk(Action::Out) => "clock-out failed",
            Self::AdminRecognize => "recognize failed",
            Self::AdminEnroll { .. } => "enroll failed",
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual(a) | Self::LiveCapture(a) | Self::Kiosk(a) => {
                write!(f, "{} {a}", self.name())
            }
            Self::AdminRecognize => f.write_str(self.name()),
            Self::AdminEnroll { email } => write!(f, "{} {email}", self.name()),
        }
    }
}

/// An image attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    /// Form field name (`file` or `files`).
    pub field: &'static str,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImagePart {
    #[must_use]
    pub fn jpeg(field: &'static str, file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            field,
            file_name: file_name.into(),
            bytes: bytes.to_vec(),
        }
    }
}

/// A fully assembled verification request, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub mode: &'static str,
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    /// Text form fields, in send order.
    pub fields: Vec<(&'static str, String)>,
    pub files: Vec<ImagePart>,
    /// Bearer token, when the mode carries one.
    pub bearer: Option<String>,
}

impl VerificationRequest {
    /// Assemble the request for `mode`.
    ///
    /// `position` is encoded as `lat`, `lng` and (when known) `accuracy`.
    /// Manual and kiosk modes send accuracy rounded to whole meters.
    #[must_use]
    pub fn build(
        mode: &SubmissionMode,
        position: Option<&PositionReading>,
        files: Vec<ImagePart>,
        bearer: Option<String>,
        threshold: f64,
    ) -> Self {
        let mut fields = Vec::new();
        match mode {
            SubmissionMode::Kiosk(action) => fields.push(("action", action.as_str().to_string())),
            SubmissionMode::AdminEnroll { email } => fields.push(("email", email.clone())),
            _ => {}
        }

        if let Some(pos) = position {
            fields.push(("lat", pos.latitude.to_string()));
            fields.push(("lng", pos.longitude.to_string()));
            if let Some(acc) = pos.accuracy_meters {
                let acc = match mode {
                    SubmissionMode::Manual(_) | SubmissionMode::Kiosk(_) => acc.round().to_string(),
                    _ => acc.to_string(),
                };
                fields.push(("accuracy", acc));
            }
        }

        let query = if mode.uses_threshold() {
            vec![("th", threshold.to_string())]
        } else {
            Vec::new()
        };

        Self {
            mode: mode.name(),
            path: mode.path(),
            query,
            fields,
            files,
            bearer: if mode.requires_credential() { bearer } else { None },
        }
    }

    /// Value of a form field, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}
