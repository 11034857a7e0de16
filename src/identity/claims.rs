//! Display-only decoding of bearer token claims.
//!
//! The signature is never checked. Claims decoded here are for labels and
//! expiry hints; the server stays the only authority on role and identity.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Claims the client knows how to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the payload segment of a `header.payload.signature` token.
    ///
    /// Returns `None` for anything that is not a three-part token with a
    /// base64url JSON payload.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims = serde_json::from_slice(&bytes).ok();
        trace!(decoded = claims.is_some(), "Token claims decoded");
        claims
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp?, 0)
    }

    /// True if `exp` is present and not after `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Best name found in the claims: `name`, then `username`, then `sub`.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        [&self.name, &self.username, &self.sub]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }
}

/// Name to greet the user with.
///
/// Precedence: the stored name, then the claims label, then `"User"`.
#[must_use]
pub fn display_name(stored: Option<&str>, claims: Option<&TokenClaims>) -> String {
    stored
        .filter(|s| !s.trim().is_empty())
        .or_else(|| claims.and_then(TokenClaims::label))
        .unwrap_or("User")
        .to_string()
}
