//! Per-tenant resources for the remote backend.
//!
//! Each tenant (one core of the remote index service) gets exactly one
//! [`TenantResources`]: a client handle shared by an indexer, a searcher and a
//! schema manager, plus a [`TenantLock`] and an observable status.
//!
//! ```text
//! TenantManager
//!   └── tenant id ──► Arc<TenantResources>
//!                        ├── RemoteClient ◄── RemoteIndexer
//!                        │                ◄── RemoteSearch
//!                        │                ◄── RemoteSchema
//!                        ├── TenantLock
//!                        └── StatusHandle
//! ```
//!
//! Closing a tenant releases its client. The manager does not coordinate
//! `close` with holders of the lock; callers order the two.
//!
//! The lock is held by a [`LockOwner`] token, so an administrative task can
//! keep it across `.await` points:
//!
//! ```rust,ignore
//! let admin = LockOwner::new();
//! manager.lock("acme", admin).await?;
//! let tenant = manager.get("acme")?;
//! tenant.schema().ensure_fields().await?;
//! manager.unlock("acme", admin)?;
//! ```

pub mod lock;

use std::collections::BTreeMap;
use std::sync::Arc;

use cms_search_core::{Error, Result, StatusHandle, TenantStatus};
use parking_lot::RwLock;

use crate::backend::ContentSearcher;
use crate::category::CategorySource;
use crate::document::IndexedDocument;
use crate::language::LanguageSource;
use crate::remote::{RemoteClient, RemoteIndexer, RemoteSchema, RemoteSearch};
use crate::types::{RemoteConfig, SearchConfig};

pub use lock::{LockOwner, TenantLock};

// ============================================================================
// TenantResources
// ============================================================================

/// Long-lived resources of one tenant.
pub struct TenantResources {
    tenant: String,
    client: RemoteClient,
    indexer: RemoteIndexer,
    searcher: RemoteSearch,
    schema: RemoteSchema,
    lock: TenantLock,
    status: StatusHandle,
}

impl TenantResources {
    /// Wire the resources of a tenant.
    ///
    /// `languages` and `categories` are handed through to the indexer, the
    /// schema manager and the searcher.
    ///
    /// # Errors
    ///
    /// A setup error if the connection settings are invalid.
    pub fn new(
        tenant: impl Into<String>,
        connection: &RemoteConfig,
        config: &SearchConfig,
        languages: Arc<dyn LanguageSource>,
        categories: Arc<dyn CategorySource>,
    ) -> Result<Self> {
        let tenant = tenant.into();
        log::debug!("Creating remote resources for {tenant}");

        let client = RemoteClient::connect(connection)?;
        let search_config = SearchConfig {
            languages: languages.language_codes(),
            ..config.clone()
        };

        Ok(Self {
            indexer: RemoteIndexer::new(client.clone(), Arc::clone(&languages)),
            searcher: RemoteSearch::new(client.clone(), &search_config, categories),
            schema: RemoteSchema::new(client.clone(), languages),
            lock: TenantLock::new(tenant.clone()),
            status: StatusHandle::new(tenant.clone()),
            client,
            tenant,
        })
    }

    /// Tenant identifier.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Core on the remote service.
    pub fn core(&self) -> &str {
        self.client.core()
    }

    /// Shared client handle.
    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    /// Document indexer.
    pub fn indexer(&self) -> &RemoteIndexer {
        &self.indexer
    }

    /// Searcher.
    pub fn searcher(&self) -> &RemoteSearch {
        &self.searcher
    }

    /// Schema manager.
    pub fn schema(&self) -> &RemoteSchema {
        &self.schema
    }

    /// Status handle.
    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Administrative lock.
    pub fn admin_lock(&self) -> &TenantLock {
        &self.lock
    }

    /// Acquire the administrative lock for `owner` (reentrant).
    pub async fn lock(&self, owner: LockOwner) {
        self.lock.lock(owner).await;
    }

    /// Release one hold of the administrative lock.
    pub fn unlock(&self, owner: LockOwner) -> Result<()> {
        self.lock.unlock(owner)
    }

    /// Returns `true` if any owner holds the administrative lock.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Create missing schema fields and mark the tenant ready.
    ///
    /// On failure the status becomes [`TenantStatus::Failed`].
    pub async fn prepare(&self) -> Result<()> {
        match self.schema.ensure_fields().await {
            Ok(_) => {
                self.status.set(TenantStatus::Ready);
                Ok(())
            }
            Err(e) => {
                self.status.set(TenantStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Replace every document of the tenant with `docs`.
    ///
    /// Runs under the administrative lock of `owner` (taken reentrantly) with
    /// the status set to [`TenantStatus::Reindexing`]; searches keep being
    /// served. Returns the number of documents sent.
    pub async fn reindex(&self, owner: LockOwner, docs: &[IndexedDocument]) -> Result<usize> {
        self.lock.lock(owner).await;
        self.status.set(TenantStatus::Reindexing);
        let result = self.rebuild(docs).await;
        match &result {
            Ok(count) => {
                log::info!("Reindexed {count} documents for {}", self.tenant);
                self.status.set(TenantStatus::Ready);
            }
            Err(e) => self.status.set(TenantStatus::Failed(e.to_string())),
        }
        self.lock.unlock(owner)?;
        result
    }

    async fn rebuild(&self, docs: &[IndexedDocument]) -> Result<usize> {
        self.indexer.delete_all().await?;
        if !docs.is_empty() {
            self.indexer.add_documents(docs).await?;
        }
        self.indexer.commit().await?;
        Ok(docs.len())
    }

    /// Retire the searcher and release the client handle.
    pub async fn close(&self) -> Result<()> {
        if self.status.get() == TenantStatus::Closed {
            return Ok(());
        }
        self.status.set(TenantStatus::Closing);
        let result = self.searcher.close().await;
        self.client.close();
        self.status.set(TenantStatus::Closed);
        result
    }
}

impl std::fmt::Debug for TenantResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResources")
            .field("tenant", &self.tenant)
            .field("client", &self.client)
            .field("status", &self.status.get())
            .field("locked", &self.is_locked())
            .finish()
    }
}

// ============================================================================
// TenantManager
// ============================================================================

/// Registry of tenant resources.
pub struct TenantManager {
    config: SearchConfig,
    languages: Arc<dyn LanguageSource>,
    categories: Arc<dyn CategorySource>,
    tenants: RwLock<BTreeMap<String, Arc<TenantResources>>>,
}

impl TenantManager {
    /// Create an empty registry.
    pub fn new(
        config: SearchConfig,
        languages: Arc<dyn LanguageSource>,
        categories: Arc<dyn CategorySource>,
    ) -> Self {
        Self {
            config,
            languages,
            categories,
            tenants: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create and register the resources of a tenant.
    ///
    /// # Errors
    ///
    /// [`Error::TenantExists`] if the tenant is already registered, or a
    /// setup error for invalid connection settings.
    pub fn create(&self, tenant: &str, connection: &RemoteConfig) -> Result<Arc<TenantResources>> {
        let mut tenants = self.tenants.write();
        if tenants.contains_key(tenant) {
            return Err(Error::TenantExists {
                tenant: tenant.to_string(),
            });
        }
        let resources = Arc::new(TenantResources::new(
            tenant,
            connection,
            &self.config,
            Arc::clone(&self.languages),
            Arc::clone(&self.categories),
        )?);
        tenants.insert(tenant.to_string(), Arc::clone(&resources));
        log::info!("Registered tenant {tenant} (core {})", resources.core());
        Ok(resources)
    }

    /// Resources of a tenant.
    pub fn get(&self, tenant: &str) -> Result<Arc<TenantResources>> {
        self.tenants
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| Error::TenantNotFound {
                tenant: tenant.to_string(),
            })
    }

    /// Acquire a tenant's administrative lock for `owner`, waiting until
    /// available.
    pub async fn lock(&self, tenant: &str, owner: LockOwner) -> Result<()> {
        self.get(tenant)?.lock(owner).await;
        Ok(())
    }

    /// Release one hold of a tenant's administrative lock.
    pub fn unlock(&self, tenant: &str, owner: LockOwner) -> Result<()> {
        self.get(tenant)?.unlock(owner)
    }

    /// Returns whether a tenant's administrative lock is held.
    pub fn is_locked(&self, tenant: &str) -> Result<bool> {
        Ok(self.get(tenant)?.is_locked())
    }

    /// Unregister a tenant and release its client handle.
    pub async fn close(&self, tenant: &str) -> Result<()> {
        let resources = self
            .tenants
            .write()
            .remove(tenant)
            .ok_or_else(|| Error::TenantNotFound {
                tenant: tenant.to_string(),
            })?;
        resources.close().await?;
        log::info!("Closed tenant {tenant}");
        Ok(())
    }

    /// Close every tenant. Returns the first failure after trying all.
    pub async fn close_all(&self) -> Result<()> {
        let all: Vec<Arc<TenantResources>> = {
            let mut tenants = self.tenants.write();
            std::mem::take(&mut *tenants).into_values().collect()
        };
        let mut first = None;
        for resources in all {
            if let Err(e) = resources.close().await {
                log::warn!("Failed to close tenant {}: {e}", resources.tenant());
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Registered tenant identifiers, sorted.
    pub fn tenants(&self) -> Vec<String> {
        self.tenants.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for TenantManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantManager")
            .field("tenants", &self.tenants())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
