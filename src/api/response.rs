//! Wire types returned by the verification backend.
//!
//! Every field the server may omit is optional here; absent stays absent.

use serde::{Deserialize, Serialize};

/// Identity matched by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedIdentity {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Body of a successful clock call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttendanceBody {
    #[serde(default)]
    pub ok: bool,
    pub action: Option<String>,
    pub score: Option<f64>,
    pub distance_m: Option<f64>,
    pub slot: Option<String>,
    pub attendance_id: Option<i64>,
    pub user: Option<MatchedIdentity>,
}

/// Body of `/api/admin/recognize`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecognizeBody {
    #[serde(default)]
    pub found: bool,
    pub score: Option<f64>,
    pub user: Option<MatchedIdentity>,
}

/// Body of `/api/admin/enroll`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnrollBody {
    #[serde(default)]
    pub ok: bool,
    pub added: Option<u32>,
    pub total: Option<u32>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Human-readable detail, if the server sent one.
    ///
    /// Validation errors arrive as a list of objects; their `msg` fields are
    /// joined.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                    .collect();
                (!msgs.is_empty()).then(|| msgs.join("; "))
            }
            _ => None,
        }
    }
}

/// Body of `/api/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginBody {
    pub access_token: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}
