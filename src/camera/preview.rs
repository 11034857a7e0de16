//! Locally-addressable preview handles for captured snapshots.
//!
//! A [`PreviewHandle`] is created with every snapshot and registers the
//! encoded bytes under a `preview:<uuid>` address. Dropping the handle
//! releases the address, so a snapshot that leaves the collection can never
//! leave a dangling preview behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Default)]
struct RegistryState {
    live: HashMap<Uuid, Arc<[u8]>>,
    created: usize,
    released: usize,
}

/// Shared table of live preview addresses.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // Every critical section leaves the map consistent, so poisoning is ignored.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register `bytes` and return the handle that owns the address.
    #[must_use]
    pub fn create(&self, bytes: Arc<[u8]>) -> PreviewHandle {
        let id = Uuid::new_v4();
        let mut state = self.state();
        state.live.insert(id, bytes);
        state.created += 1;
        trace!(%id, live = state.live.len(), "Preview handle created");
        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Bytes behind a live preview address.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id = url.strip_prefix(PREVIEW_SCHEME)?.parse::<Uuid>().ok()?;
        self.state().live.get(&id).cloned()
    }

    #[must_use]
    pub fn is_live(&self, id: Uuid) -> bool {
        self.state().live.contains_key(&id)
    }

    /// Handles currently registered.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    /// Handles ever created.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.state().created
    }

    /// Handles released so far.
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.state().released
    }

    fn release(&self, id: Uuid) {
        let mut state = self.state();
        if state.live.remove(&id).is_some() {
            state.released += 1;
            trace!(%id, live = state.live.len(), "Preview handle released");
        }
    }
}

const PREVIEW_SCHEME: &str = "preview:";

/// Owner of one preview address; released exactly once, on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Address usable with [`PreviewRegistry::resolve`].
    #[must_use]
    pub fn url(&self) -> String {
        format!("{PREVIEW_SCHEME}{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
