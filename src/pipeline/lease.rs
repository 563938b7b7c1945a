//! Best-effort "keep running" leases held for the duration of a compile.
//!
//! A [`BackgroundLease`] is released exactly once: when it is dropped, or earlier when the platform
//! revokes it through a [`LeaseRevocation`]. Revocation is a hint; the compile keeps going.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifier handed out by a [`LeaseProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LeaseId(pub u64);

/// Platform hook that keeps the process alive while work is in flight.
pub trait LeaseProvider: Send + Sync {
    /// Ask for a lease. `on_expire` may be called by the platform at any time to revoke it.
    ///
    /// Returns `None` when no lease could be obtained; the compile proceeds without one.
    fn begin(&self, name: &str, on_expire: LeaseRevocation) -> Option<LeaseId>;

    /// Give a lease back. Called at most once per id.
    fn end(&self, id: LeaseId);
}

/// Provider for hosts without a suspension model.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLeaseProvider;

impl LeaseProvider for NoopLeaseProvider {
    fn begin(&self, _name: &str, _on_expire: LeaseRevocation) -> Option<LeaseId> {
        None
    }

    fn end(&self, _id: LeaseId) {}
}

struct LeaseState {
    provider: Arc<dyn LeaseProvider>,
    id: Mutex<Option<LeaseId>>,
    revoked: AtomicBool,
}

impl LeaseState {
    fn release(&self) {
        let id = self
            .id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = id {
            self.provider.end(id);
        }
    }
}

/// Scoped lease; released on drop if not revoked first.
pub struct BackgroundLease {
    state: Arc<LeaseState>,
}

impl std::fmt::Debug for BackgroundLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundLease")
            .field("held", &self.is_held())
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

impl BackgroundLease {
    /// Acquire a lease named `name` from `provider`.
    pub fn acquire(provider: Arc<dyn LeaseProvider>, name: &str) -> Self {
        let state = Arc::new(LeaseState {
            provider,
            id: Mutex::new(None),
            revoked: AtomicBool::new(false),
        });
        let revocation = LeaseRevocation {
            state: Arc::downgrade(&state),
        };
        let id = state.provider.begin(name, revocation);
        if id.is_none() {
            tracing::debug!(name, "no background lease granted");
        }
        *state.id.lock().unwrap_or_else(PoisonError::into_inner) = id;
        // The platform may have revoked while `begin` was still running.
        if state.revoked.load(Ordering::SeqCst) {
            state.release();
        }
        Self { state }
    }

    /// Whether the lease is still held.
    pub fn is_held(&self) -> bool {
        self.state
            .id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Whether the platform revoked the lease.
    pub fn is_revoked(&self) -> bool {
        self.state.revoked.load(Ordering::SeqCst)
    }
}

impl Drop for BackgroundLease {
    fn drop(&mut self) {
        self.state.release();
    }
}

/// Handle the platform uses to revoke a lease early.
///
/// Holds only a weak reference, so a revocation arriving after the compile finished does nothing.
#[derive(Clone)]
pub struct LeaseRevocation {
    state: std::sync::Weak<LeaseState>,
}

impl std::fmt::Debug for LeaseRevocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseRevocation")
            .field("live", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl LeaseRevocation {
    /// Release the lease now. Later drops and repeated calls are no-ops.
    pub fn revoke(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        if !state.revoked.swap(true, Ordering::SeqCst) {
            tracing::warn!("background lease revoked by the platform; compile continues");
        }
        state.release();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/lease.rs"]
mod tests;
