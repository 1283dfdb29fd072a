//! In-flight request registry.
//!
//! Every probe and transfer registers a cancellation token here for its
//! lifetime. Stopping a session cancels everything currently registered, which
//! makes in-flight HTTP streams return promptly instead of draining to
//! completion. Registration hands out a guard that deregisters on drop, so
//! finished requests never linger in the registry.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Registry of cancellation tokens for requests currently in flight.
#[derive(Debug, Default)]
pub struct CancelRegistry {
    handles: DashMap<u64, CancellationToken>,
    next_id: AtomicU64,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new in-flight request. The returned guard deregisters it
    /// when dropped.
    pub fn register(&self) -> RegisteredCancel<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.handles.insert(id, token.clone());
        RegisteredCancel {
            registry: self,
            id,
            token,
        }
    }

    /// Cancel every registered request and clear the registry.
    pub fn cancel_all(&self) {
        for entry in self.handles.iter() {
            entry.value().cancel();
        }
        self.handles.clear();
    }

    /// Number of requests currently in flight.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Guard for one registered request. Dropping it removes the request from
/// the registry; the token itself stays usable by clones.
#[derive(Debug)]
pub struct RegisteredCancel<'a> {
    registry: &'a CancelRegistry,
    id: u64,
    token: CancellationToken,
}

impl RegisteredCancel<'_> {
    /// Cancellation token for this request.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RegisteredCancel<'_> {
    fn drop(&mut self) {
        self.registry.handles.remove(&self.id);
    }
}
