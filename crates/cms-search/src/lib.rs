//! Content search for a multi-tenant CMS.
//!
//! Ranked content identifiers and hierarchical category counts, filtered by
//! the caller's access groups, from either an embedded tantivy index
//! (feature-gated) or a remote index service shared by many tenants.
//!
//! # Features
//!
//! - `local` (default): the embedded backend, indexer and taxonomy store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       cms-search                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Category / TaxonomyTree (path model, prefix tree)          │
//! │  GroupPolicy (free / administrators visibility)             │
//! │  QueryBuilder (term map + groups → QueryTree)               │
//! │  Facets (requests, single-pass aggregation)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ContentSearcher trait                                      │
//! │  ├── LocalSearch (per-call readers, tantivy)                │
//! │  └── RemoteSearch (shared client handle)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LocalIndexer + TaxonomyWriter                              │
//! │  RemoteIndexer, RemoteSchema                                │
//! │  TenantManager → TenantResources (client, lock, status)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Visibility
//!
//! An empty group set means the free group only. A set containing the
//! administrators group sees everything. Any other set also sees the free
//! group. Groups are compared lowercased.
//!
//! # Example
//!
//! ```rust,ignore
//! use cms_search::{ContentSearcher, LocalSearch, SearchQuery, Category};
//!
//! let search = LocalSearch::init("/var/cms/index", "/var/cms/taxonomy")?;
//! let query = SearchQuery::word("en", "Venice Amsterdam", ["editors"])
//!     .with_category(Category::parse("/travel")?);
//! let outcome = search.search(&query).await?;
//! for id in &outcome.ids {
//!     println!("{id}");
//! }
//! search.close().await?;
//! ```

// Core modules (always available)
pub mod backend;
pub mod category;
pub mod document;
pub mod facet;
pub mod group;
pub mod language;
pub mod query;
pub mod remote;
pub mod tenant;
pub mod types;

// Feature-gated embedded backend
#[cfg(feature = "local")]
pub mod local;

// Re-exports
pub use backend::{ContentSearcher, SearchOutcome, create_backend};
pub use category::{Category, CategorySource, PATH_DELIMITER, TaxonomyTree};
pub use cms_search_core::{Error, Result, StatusHandle, TenantStatus};
pub use document::{
    CATEGORY_FIELD, CONTENT_ID_FIELD, GROUP_FIELD, IndexedDocument, IndexedDocumentBuilder,
};
pub use facet::{DEFAULT_MAX_RESULTS, FacetCounts, FacetRequest, aggregate, build_facet_requests};
pub use group::{ADMINS_GROUP, FREE_GROUP, GroupPolicy, Visibility};
pub use language::{LanguageSource, StaticLanguages};
pub use query::{QueryBuilder, QueryTree, SearchQuery, TermMap, WordMode};
pub use remote::{RemoteClient, RemoteIndexer, RemoteSchema, RemoteSearch};
pub use tenant::{LockOwner, TenantLock, TenantManager, TenantResources};
pub use types::{BackendKind, RemoteConfig, SearchConfig};

#[cfg(feature = "local")]
pub use local::{
    FsSnapshotOpener, IndexSchema, LocalIndexer, LocalSearch, OpenedIndex, SnapshotOpener,
    TaxonomyReader, TaxonomyWriter,
};
