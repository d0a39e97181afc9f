//! Search backend trait and factory.
//!
//! Both backends answer the same contract:
//!
//! - `LocalSearch` opens an embedded index and its taxonomy on every call
//!   (requires the `local` feature);
//! - `RemoteSearch` borrows a tenant's long-lived client handle to a remote
//!   index service.
//!
//! # Example
//!
//! ```rust,ignore
//! use cms_search::{create_backend, SearchConfig, SearchQuery};
//!
//! let backend = create_backend(&config).await?;
//! let ids = backend
//!     .search_contents_id(&SearchQuery::word("en", "Venice", ["editors"]))
//!     .await?;
//! backend.close().await?;
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use cms_search_core::Result;
use serde::{Deserialize, Serialize};

use crate::category::TaxonomyTree;
use crate::facet::FacetCounts;
use crate::query::SearchQuery;
use crate::types::{BackendKind, SearchConfig};

/// Result of one search call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Content identifiers in rank order.
    pub ids: Vec<String>,
    /// Matched-document counts per category.
    pub facets: FacetCounts,
}

/// Common contract of the search backends.
///
/// Implementations are safe to call concurrently. No implementation takes a
/// tenant lock while searching.
#[async_trait]
pub trait ContentSearcher: Send + Sync {
    /// Run a query; returns ranked identifiers and facet counts computed in
    /// the same pass.
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome>;

    /// Ranked content identifiers for a query, best match first, truncated at
    /// the configured result cap. Equal scores are ordered by identifier.
    async fn search_contents_id(&self, query: &SearchQuery) -> Result<Vec<String>> {
        Ok(self.search(query).await?.ids)
    }

    /// Single-field form: the words of `word` looked up in the `lang_code`
    /// text field.
    async fn search_word(
        &self,
        lang_code: &str,
        word: &str,
        allowed_groups: &[String],
    ) -> Result<Vec<String>> {
        let query = SearchQuery::word(lang_code, word, allowed_groups.iter().cloned());
        self.search_contents_id(&query).await
    }

    /// Release backend-held resources. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;

    /// Returns `true` once `close` has been called.
    fn is_closed(&self) -> bool;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Order scored hits best first; ties broken by identifier.
pub(crate) fn rank(mut hits: Vec<(f32, String)>) -> Vec<String> {
    hits.sort_by(|(sa, ia), (sb, ib)| match sb.total_cmp(sa) {
        Ordering::Equal => ia.cmp(ib),
        other => other,
    });
    hits.into_iter().map(|(_, id)| id).collect()
}

/// Create a backend from configuration.
///
/// The remote backend created here owns a private client handle and has no
/// category service; tenants built through `TenantManager` share theirs.
///
/// # Errors
///
/// Fails with a setup error when the local directories or the remote
/// address are unusable.
pub async fn create_backend(config: &SearchConfig) -> Result<Box<dyn ContentSearcher>> {
    config.validate()?;
    match config.backend {
        #[cfg(feature = "local")]
        BackendKind::Local => Ok(Box::new(crate::local::LocalSearch::from_config(config)?)),
        #[cfg(not(feature = "local"))]
        BackendKind::Local => Err(cms_search_core::Error::config(
            "local backend requires the `local` feature",
        )),
        BackendKind::Remote => {
            let remote = config
                .remote
                .as_ref()
                .ok_or_else(|| cms_search_core::Error::config("missing [remote] section"))?;
            let client = crate::remote::RemoteClient::connect(remote)?;
            Ok(Box::new(crate::remote::RemoteSearch::new(
                client,
                config,
                Arc::new(TaxonomyTree::new()),
            )))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
