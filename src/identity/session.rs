//! File-backed session for the command-line client.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Credential, IdentityStore, TokenClaims};
use crate::error::{AttendError, Result, ResultExt};

/// Contents of `session.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    #[must_use]
    pub fn credential(&self) -> Credential {
        Credential::new(&self.access_token, &self.role, &self.name)
    }

    #[must_use]
    pub fn claims(&self) -> Option<TokenClaims> {
        TokenClaims::decode(&self.access_token)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.claims().is_some_and(|c| c.is_expired())
    }
}

/// Session persisted as JSON on disk.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/attend/session.json`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("attend").join("session.json"))
            .ok_or_else(|| AttendError::Other("Could not determine data directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session; `None` if there is none.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(session).with_context(|| "Failed to serialize session")?;
        fs::write(&self.path, content)?;
        info!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Delete the stored session. Returns true if one existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        info!(path = %self.path.display(), "Session cleared");
        Ok(true)
    }
}

impl IdentityStore for SessionFile {
    fn current_credential(&self) -> Option<Credential> {
        let session = match self.load() {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Session file unreadable");
                return None;
            }
        };
        if session.is_expired() {
            debug!("Stored session has expired");
            return None;
        }
        Some(session.credential())
    }
}
