//! Identity store: who is submitting.
//!
//! The orchestrator only reads from an [`IdentityStore`]. Setting and
//! clearing the credential (login, logout, a 401) belongs to the caller.

mod claims;
mod session;

pub use claims::{TokenClaims, display_name};
pub use session::{SessionFile, StoredSession};

use std::sync::{Mutex, PoisonError};

/// Bearer credential plus the profile returned at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub role: String,
    pub name: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            role: role.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }

    /// Display-only claims decoded from the token.
    #[must_use]
    pub fn claims(&self) -> Option<TokenClaims> {
        TokenClaims::decode(&self.token)
    }
}

/// Read access to the current credential.
pub trait IdentityStore {
    /// The credential to attach, or `None` when signed out or expired.
    fn current_credential(&self) -> Option<Credential>;

    fn is_authenticated(&self) -> bool {
        self.current_credential().is_some()
    }
}

impl<T: IdentityStore + ?Sized> IdentityStore for &T {
    fn current_credential(&self) -> Option<Credential> {
        (**self).current_credential()
    }
}

/// In-process identity store.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    credential: Mutex<Option<Credential>>,
}

impl MemoryIdentity {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }

    pub fn set(&self, credential: Credential) {
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    pub fn clear(&self) {
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl IdentityStore for MemoryIdentity {
    fn current_credential(&self) -> Option<Credential> {
        let credential = self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        if credential.claims().is_some_and(|c| c.is_expired()) {
            return None;
        }
        Some(credential)
    }
}
