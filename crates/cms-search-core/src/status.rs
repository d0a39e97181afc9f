//! Tenant lifecycle status.
//!
//! Every tenant's resource bundle carries a [`StatusHandle`]. Administrative
//! sequences (full reindex, schema rebuild) move it through
//! [`TenantStatus::Reindexing`] so other parts of an application can observe
//! the tenant without touching its lock.
//!
//! ```rust
//! use cms_search_core::status::{StatusHandle, TenantStatus};
//!
//! let status = StatusHandle::new("tenant-a");
//! assert_eq!(status.get(), TenantStatus::Created);
//!
//! status.set(TenantStatus::Ready);
//! assert!(status.get().is_searchable());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

// ============================================================================
// TenantStatus
// ============================================================================

/// Lifecycle state of a tenant's resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TenantStatus {
    /// Resources were wired but not yet checked against the backend.
    Created,
    /// Resources are usable.
    Ready,
    /// An administrative reindex is running; searches still work.
    Reindexing,
    /// `close` is in progress.
    Closing,
    /// The client handle has been released.
    Closed,
    /// Setup or an administrative operation failed.
    Failed(String),
}

impl TenantStatus {
    /// Returns `true` if searches can be served.
    pub fn is_searchable(&self) -> bool {
        matches!(self, Self::Ready | Self::Reindexing)
    }

    /// Returns `true` once the tenant can no longer become usable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Ready => write!(f, "ready"),
            Self::Reindexing => write!(f, "reindexing"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

// ============================================================================
// StatusHandle
// ============================================================================

/// Shared, observable status of one tenant.
///
/// Clones share the same state; changes are broadcast to subscribers.
#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<StatusInner>,
}

struct StatusInner {
    tenant: String,
    tx: watch::Sender<TenantStatus>,
    since: Instant,
}

impl StatusHandle {
    /// Create a handle in the [`TenantStatus::Created`] state.
    pub fn new(tenant: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(TenantStatus::Created);
        Self {
            inner: Arc::new(StatusInner {
                tenant: tenant.into(),
                tx,
                since: Instant::now(),
            }),
        }
    }

    /// Tenant this status belongs to.
    pub fn tenant(&self) -> &str {
        &self.inner.tenant
    }

    /// Current status.
    pub fn get(&self) -> TenantStatus {
        self.inner.tx.borrow().clone()
    }

    /// Replace the status and notify subscribers.
    pub fn set(&self, status: TenantStatus) {
        log::info!("Tenant '{}' -> {status}", self.inner.tenant);
        self.inner.tx.send_replace(status);
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<TenantStatus> {
        self.inner.tx.subscribe()
    }

    /// Wait until the tenant is searchable.
    ///
    /// Fails if the tenant reaches a terminal state or `timeout` elapses.
    pub async fn wait_searchable(&self, timeout: Duration) -> Result<(), String> {
        let mut rx = self.subscribe();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            {
                let status = rx.borrow_and_update().clone();
                if status.is_searchable() {
                    return Ok(());
                }
                if status.is_terminal() {
                    return Err(format!("Tenant '{}' is {status}", self.inner.tenant));
                }
            }

            tokio::select! {
                _ = &mut deadline => {
                    return Err(format!(
                        "Tenant '{}' not searchable after {timeout:?} (status: {})",
                        self.inner.tenant, self.get()
                    ));
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(format!("Tenant '{}' status channel closed", self.inner.tenant));
                    }
                }
            }
        }
    }

    /// Time since the handle was created.
    pub fn age(&self) -> Duration {
        self.inner.since.elapsed()
    }
}

impl fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusHandle")
            .field("tenant", &self.inner.tenant)
            .field("status", &self.get())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(TenantStatus::Created.to_string(), "created");
        assert_eq!(TenantStatus::Reindexing.to_string(), "reindexing");
        assert_eq!(
            TenantStatus::Failed("no core".to_string()).to_string(),
            "failed: no core"
        );
    }

    #[test]
    fn test_status_predicates() {
        assert!(TenantStatus::Ready.is_searchable());
        assert!(TenantStatus::Reindexing.is_searchable());
        assert!(!TenantStatus::Created.is_searchable());
        assert!(!TenantStatus::Closed.is_searchable());

        assert!(TenantStatus::Closed.is_terminal());
        assert!(TenantStatus::Failed("x".into()).is_terminal());
        assert!(!TenantStatus::Closing.is_terminal());
    }

    #[test]
    fn test_clones_share_status() {
        let a = StatusHandle::new("t");
        let b = a.clone();
        a.set(TenantStatus::Ready);
        assert_eq!(b.get(), TenantStatus::Ready);
        assert_eq!(b.tenant(), "t");
    }

    #[tokio::test]
    async fn test_wait_searchable_after_transition() {
        let status = StatusHandle::new("t");
        let s = status.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            s.set(TenantStatus::Ready);
        });
        assert!(status.wait_searchable(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_searchable_terminal() {
        let status = StatusHandle::new("t");
        status.set(TenantStatus::Closed);
        let err = status
            .wait_searchable(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.contains("closed"));
    }

    #[tokio::test]
    async fn test_wait_searchable_timeout() {
        let status = StatusHandle::new("slow");
        let err = status
            .wait_searchable(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.contains("not searchable after"));
    }

    #[test]
    fn test_status_handle_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StatusHandle>();
    }
}
