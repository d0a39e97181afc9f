//! Embedded search backend.
//!
//! Provides `LocalSearch`, the backend over an on-disk tantivy index and a
//! separate taxonomy directory. This module is only available with the
//! `local` feature.
//!
//! # Per-call resources
//!
//! Every search opens a fresh index reader and a fresh taxonomy reader,
//! executes, and releases both:
//!
//! ```text
//! UNOPENED ──► OPEN(index, taxonomy) ──► EXECUTED ──► RELEASED
//!                  │                                      ▲
//!                  └──────────── on failure ──────────────┘
//! ```
//!
//! Each release is attempted independently of the other and of the search
//! outcome. When the search failed its error is returned and release
//! failures are logged; otherwise the first release failure is returned.

pub mod indexer;
pub mod render;
pub mod schema;
pub mod taxonomy;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use cms_search_core::{Error, Result};
use tantivy::collector::sort_key::{SortBySimilarityScore, SortByString};
use tantivy::collector::{FacetCollector, MultiCollector, TopDocs};
use tantivy::schema::{Facet, Value};
use tantivy::{DocAddress, Index, IndexReader, Order, ReloadPolicy, Searcher, TantivyDocument};

use crate::backend::{ContentSearcher, SearchOutcome};
use crate::category::Category;
use crate::document::{CATEGORY_FIELD, CONTENT_ID_FIELD};
use crate::facet::{self, build_facet_requests};
use crate::query::{QueryBuilder, SearchQuery};
use crate::types::SearchConfig;

pub use indexer::LocalIndexer;
pub use schema::IndexSchema;
pub use taxonomy::{TaxonomyReader, TaxonomyWriter};

// ============================================================================
// Per-call resources
// ============================================================================

/// An index reader opened for one search call.
pub struct OpenedIndex {
    dir: PathBuf,
    reader: IndexReader,
    searcher: Searcher,
    schema: IndexSchema,
}

impl OpenedIndex {
    /// Open the index stored in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let index = Index::open_in_dir(dir).map_err(|e| {
            Error::search_with_source(format!("Failed to open index in {}", dir.display()), e)
        })?;
        IndexSchema::register_tokenizers(&index);
        let schema = IndexSchema::from_index(&index).map_err(|e| {
            Error::search_with_source(format!("Unusable index in {}", dir.display()), e)
        })?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::search_with_source("Failed to create index reader", e))?;
        let searcher = reader.searcher();
        Ok(Self {
            dir: dir.to_path_buf(),
            reader,
            searcher,
            schema,
        })
    }

    /// Searcher over the snapshot taken at open time.
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    /// Typed schema of the index.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Release the reader.
    pub fn close(self) -> Result<()> {
        drop(self.searcher);
        drop(self.reader);
        log::trace!("Released index reader for {}", self.dir.display());
        Ok(())
    }
}

impl std::fmt::Debug for OpenedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedIndex")
            .field("dir", &self.dir)
            .field("num_docs", &self.searcher.num_docs())
            .finish()
    }
}

/// Opens and releases the per-call resources of [`LocalSearch`].
pub trait SnapshotOpener: Send + Sync {
    /// Open a reader over the index directory.
    fn open_index(&self, dir: &Path) -> Result<OpenedIndex>;

    /// Open a reader over the taxonomy directory.
    fn open_taxonomy(&self, dir: &Path) -> Result<TaxonomyReader>;

    /// Release an index reader.
    fn release_index(&self, index: OpenedIndex) -> Result<()> {
        index.close()
    }

    /// Release a taxonomy reader.
    fn release_taxonomy(&self, taxonomy: TaxonomyReader) -> Result<()> {
        taxonomy.close()
    }
}

/// Opens readers straight from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSnapshotOpener;

impl SnapshotOpener for FsSnapshotOpener {
    fn open_index(&self, dir: &Path) -> Result<OpenedIndex> {
        OpenedIndex::open(dir)
    }

    fn open_taxonomy(&self, dir: &Path) -> Result<TaxonomyReader> {
        TaxonomyReader::open(dir)
    }
}

// ============================================================================
// LocalSearch
// ============================================================================

struct LocalInner {
    index_dir: PathBuf,
    taxonomy_dir: PathBuf,
    builder: QueryBuilder,
    max_results: usize,
    opener: Box<dyn SnapshotOpener>,
    closed: AtomicBool,
}

/// Search backend over an embedded index.
///
/// Holds no open reader between calls, so concurrent searches never contend
/// and always see the latest commit.
#[derive(Clone)]
pub struct LocalSearch {
    inner: Arc<LocalInner>,
}

impl LocalSearch {
    /// Configure the backend over an index and a taxonomy directory with
    /// default settings.
    ///
    /// # Errors
    ///
    /// A setup error if either location is not an existing directory.
    pub fn init(index_dir: impl Into<PathBuf>, taxonomy_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::init_with(
            index_dir,
            taxonomy_dir,
            &SearchConfig::default(),
            Box::new(FsSnapshotOpener),
        )
    }

    /// Configure the backend from a [`SearchConfig`].
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let index_dir = config
            .index_path
            .as_deref()
            .ok_or_else(|| Error::setup("index_path is not configured"))?;
        let taxonomy_dir = config
            .taxonomy_path
            .as_deref()
            .ok_or_else(|| Error::setup("taxonomy_path is not configured"))?;
        Self::init_with(index_dir, taxonomy_dir, config, Box::new(FsSnapshotOpener))
    }

    /// Configure the backend with a custom [`SnapshotOpener`].
    pub fn init_with(
        index_dir: impl Into<PathBuf>,
        taxonomy_dir: impl Into<PathBuf>,
        config: &SearchConfig,
        opener: Box<dyn SnapshotOpener>,
    ) -> Result<Self> {
        let index_dir = index_dir.into();
        let taxonomy_dir = taxonomy_dir.into();
        for (what, dir) in [("index", &index_dir), ("taxonomy", &taxonomy_dir)] {
            if !dir.is_dir() {
                return Err(Error::setup(format!(
                    "{what} location {} is not a directory",
                    dir.display()
                )));
            }
        }

        log::info!(
            "Local search over {} (taxonomy {}), max {} results, {:?} words",
            index_dir.display(),
            taxonomy_dir.display(),
            config.max_results,
            config.word_mode
        );

        Ok(Self {
            inner: Arc::new(LocalInner {
                index_dir,
                taxonomy_dir,
                builder: QueryBuilder::new(config.word_mode, config.groups.clone()),
                max_results: config.max_results,
                opener,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Index directory.
    pub fn index_dir(&self) -> &Path {
        &self.inner.index_dir
    }

    /// Taxonomy directory.
    pub fn taxonomy_dir(&self) -> &Path {
        &self.inner.taxonomy_dir
    }
}

impl LocalInner {
    fn search_blocking(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        let index = self.opener.open_index(&self.index_dir)?;
        let taxonomy = match self.opener.open_taxonomy(&self.taxonomy_dir) {
            Ok(taxonomy) => taxonomy,
            Err(e) => {
                if let Err(release) = self.opener.release_index(index) {
                    log::warn!("Failed to release index reader: {release}");
                }
                return Err(e);
            }
        };
        log::debug!("Opened readers on {}", self.index_dir.display());

        let result = self.execute(&index, &taxonomy, query);

        let released_index = self.opener.release_index(index);
        let released_taxonomy = self.opener.release_taxonomy(taxonomy);
        settle(result, [released_index, released_taxonomy])
    }

    fn execute(
        &self,
        index: &OpenedIndex,
        taxonomy: &TaxonomyReader,
        query: &SearchQuery,
    ) -> Result<SearchOutcome> {
        let tree = self.builder.build_query(query);
        let tantivy_query = render::to_tantivy(&tree, index.schema())?;
        let requests = build_facet_requests(&query.categories, self.max_results);

        // Ties on score are broken by identifier inside the top-N selection so
        // the cut at `max_results` is deterministic.
        let top_docs = TopDocs::with_limit(self.max_results).order_by((
            (SortBySimilarityScore, Order::Desc),
            (SortByString::for_field(CONTENT_ID_FIELD), Order::Asc),
        ));
        let mut collectors = MultiCollector::new();
        let top_handle = collectors.add_collector(top_docs);

        // One facet collector per anchor: tantivy rejects nested facets in a
        // single collector.
        let facet_handles: Vec<_> = facet::anchors(&requests)
            .iter()
            .map(|anchor| {
                let facet = Facet::from_path(anchor.segments());
                let mut collector = FacetCollector::for_field(CATEGORY_FIELD);
                collector.add_facet(facet.clone());
                (facet, collectors.add_collector(collector))
            })
            .collect();

        let searcher = index.searcher();
        let mut fruits = searcher
            .search(tantivy_query.as_ref(), &collectors)
            .map_err(|e| Error::search_with_source("Query execution failed", e))?;

        let mut raw = BTreeMap::new();
        for (facet, handle) in facet_handles {
            let counts = handle.extract(&mut fruits);
            for (child, count) in counts.get(facet) {
                raw.insert(Category::from_segments(child.to_path())?, count);
            }
        }

        let top = top_handle.extract(&mut fruits);
        let mut ids = Vec::with_capacity(top.len());
        for ((_score, id), address) in top {
            match id {
                Some(id) => ids.push(id),
                None => ids.push(stored_id(index, address)?),
            }
        }

        let facets = facet::aggregate(&requests, &raw, taxonomy);
        log::debug!(
            "Local search matched {} documents, {} facet counts",
            ids.len(),
            facets.len()
        );
        Ok(SearchOutcome { ids, facets })
    }
}

/// Identifier of a hit read from the stored document, for indexes whose
/// identifier field is not a fast field.
fn stored_id(index: &OpenedIndex, address: DocAddress) -> Result<String> {
    let doc: TantivyDocument = index
        .searcher()
        .doc(address)
        .map_err(|e| Error::search_with_source("Failed to read matched document", e))?;
    doc.get_first(index.schema().id)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::search("matched document has no content identifier"))
}

/// Combine a search result with the outcome of the release attempts.
fn settle(result: Result<SearchOutcome>, releases: [Result<()>; 2]) -> Result<SearchOutcome> {
    let mut failures = releases.into_iter().filter_map(Result::err);
    match result {
        Ok(outcome) => match failures.next() {
            None => Ok(outcome),
            Some(first) => {
                for other in failures {
                    log::warn!("Additional release failure: {other}");
                }
                Err(first)
            }
        },
        Err(e) => {
            for failure in failures {
                log::warn!("Release failure after search error: {failure}");
            }
            Err(e)
        }
    }
}

#[async_trait]
impl ContentSearcher for LocalSearch {
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        if self.is_closed() {
            return Err(Error::closed("local search backend"));
        }
        let inner = Arc::clone(&self.inner);
        let query = query.clone();
        tokio::task::spawn_blocking(move || inner.search_blocking(&query))
            .await
            .map_err(|e| Error::search_with_source("Search task failed", e))?
    }

    async fn close(&self) -> Result<()> {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            log::info!("Closed local search over {}", self.inner.index_dir.display());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "local"
    }
}

impl std::fmt::Debug for LocalSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSearch")
            .field("index_dir", &self.inner.index_dir)
            .field("taxonomy_dir", &self.inner.taxonomy_dir)
            .field("max_results", &self.inner.max_results)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
