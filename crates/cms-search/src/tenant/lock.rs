//! Reentrant administrative lock.
//!
//! Brackets caller-defined administrative sequences (schema rebuild, full
//! reindex). Searches never take it. Ownership belongs to a [`LockOwner`]
//! token rather than a thread, so a task may hold the lock across `.await`
//! points and release it from whichever worker it resumes on. The same owner
//! may acquire it again; it is free once every `lock` has been matched by an
//! `unlock`.

use std::sync::atomic::{AtomicU64, Ordering};

use cms_search_core::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::Notify;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Identity of a lock holder.
///
/// Each call to [`LockOwner::new`] yields a distinct identity. Copies of a
/// token are the same owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockOwner(u64);

impl LockOwner {
    /// Allocate a fresh owner identity.
    pub fn new() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric identity, for diagnostics.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for LockOwner {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<LockOwner>,
    holds: usize,
}

/// Manual reentrant lock keyed on a [`LockOwner`].
#[derive(Debug)]
pub struct TenantLock {
    tenant: String,
    state: Mutex<LockState>,
    released: Notify,
}

impl TenantLock {
    /// Create an unlocked lock for a tenant.
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            state: Mutex::new(LockState::default()),
            released: Notify::new(),
        }
    }

    /// Acquire the lock for `owner`, waiting while another owner holds it.
    ///
    /// Waiting suspends the task; it never blocks a runtime worker.
    pub async fn lock(&self, owner: LockOwner) {
        loop {
            // Registered before the check so a release in between is not lost.
            let released = self.released.notified();
            if self.try_lock(owner) {
                return;
            }
            released.await;
        }
    }

    /// Acquire the lock if it is free or already held by `owner`.
    pub fn try_lock(&self, owner: LockOwner) -> bool {
        let mut state = self.state.lock();
        match state.owner {
            Some(holder) if holder != owner => false,
            _ => {
                state.owner = Some(owner);
                state.holds += 1;
                log::trace!(
                    "Tenant {} locked by owner {} (holds: {})",
                    self.tenant,
                    owner.id(),
                    state.holds
                );
                true
            }
        }
    }

    /// Release one hold of `owner`.
    ///
    /// # Errors
    ///
    /// [`Error::LockNotHeld`] if `owner` does not hold the lock.
    pub fn unlock(&self, owner: LockOwner) -> Result<()> {
        let mut state = self.state.lock();
        if state.owner != Some(owner) {
            return Err(Error::LockNotHeld {
                tenant: self.tenant.clone(),
            });
        }
        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_waiters();
            log::trace!("Tenant {} unlocked", self.tenant);
        }
        Ok(())
    }

    /// Returns `true` if any owner holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Number of unmatched `lock` calls of the current owner.
    pub fn hold_count(&self) -> usize {
        self.state.lock().holds
    }

    /// Returns `true` if `owner` holds the lock.
    pub fn is_held_by(&self, owner: LockOwner) -> bool {
        self.state.lock().owner == Some(owner)
    }
}

// ============================================================================
// Tests
// ============================================================================
