//! Searcher over the remote index service.
//!
//! The query tree is rendered into the service's boolean syntax
//! (`field:value`, `AND`, `OR`) and sent to `{address}/{core}/select`
//! together with a request for category facet counts, so ranking and counting
//! happen in the same pass on the service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use cms_search_core::{Error, Result};
use serde::Deserialize;

use crate::backend::{ContentSearcher, SearchOutcome, rank};
use crate::category::{Category, CategorySource};
use crate::document::{CATEGORY_FIELD, CONTENT_ID_FIELD, GROUP_FIELD};
use crate::facet::{self, build_facet_requests};
use crate::query::{QueryBuilder, QueryTree, SearchQuery};
use crate::remote::client::RemoteClient;
use crate::types::SearchConfig;

/// Characters with a meaning in the service's query syntax.
const SPECIAL: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if SPECIAL.contains(&c) || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a query tree into the service's query syntax.
pub fn render(tree: &QueryTree) -> String {
    fn join(clauses: &[QueryTree], op: &str) -> String {
        let parts: Vec<String> = clauses.iter().map(render).collect();
        format!("({})", parts.join(op))
    }

    match tree {
        QueryTree::MatchAll => "*:*".to_string(),
        QueryTree::Term { field, value } => format!("{field}:{}", escape(value)),
        QueryTree::All(clauses) => join(clauses, " AND "),
        QueryTree::Any(clauses) => join(clauses, " OR "),
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: DocList,
    #[serde(default)]
    facet_counts: Option<FacetSection>,
}

#[derive(Debug, Deserialize)]
struct DocList {
    #[serde(default)]
    docs: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct FacetSection {
    #[serde(default)]
    facet_fields: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Decode a flat `[value, count, value, count, ...]` facet list.
fn parse_facet_list(values: &[serde_json::Value]) -> BTreeMap<Category, u64> {
    let mut raw = BTreeMap::new();
    for pair in values.chunks_exact(2) {
        let (Some(path), Some(count)) = (pair[0].as_str(), pair[1].as_u64()) else {
            continue;
        };
        match Category::parse(path) {
            Ok(category) if !category.is_root() => {
                raw.insert(category, count);
            }
            Ok(_) => {}
            Err(e) => log::debug!("Ignoring facet value {path}: {e}"),
        }
    }
    raw
}

// ============================================================================
// RemoteSearch
// ============================================================================

/// Search backend over one core of the remote index service.
pub struct RemoteSearch {
    client: RemoteClient,
    builder: QueryBuilder,
    max_results: usize,
    languages: BTreeSet<String>,
    categories: Arc<dyn CategorySource>,
    closed: AtomicBool,
}

impl RemoteSearch {
    /// Create a searcher that borrows `client`.
    ///
    /// `categories` supplies the taxonomy used to report categories with no
    /// matching document.
    pub fn new(
        client: RemoteClient,
        config: &SearchConfig,
        categories: Arc<dyn CategorySource>,
    ) -> Self {
        Self {
            client,
            builder: QueryBuilder::new(config.word_mode, config.groups.clone()),
            max_results: config.max_results,
            languages: config.languages.iter().cloned().collect(),
            categories,
            closed: AtomicBool::new(false),
        }
    }

    /// Core this searcher queries.
    pub fn core(&self) -> &str {
        self.client.core()
    }

    fn check_fields(&self, tree: &QueryTree) -> Result<()> {
        match tree
            .fields()
            .into_iter()
            .find(|f| *f != GROUP_FIELD && *f != CONTENT_ID_FIELD && !self.languages.contains(*f))
        {
            Some(field) => Err(Error::UnknownField {
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn params(&self, q: String) -> Vec<(&'static str, String)> {
        vec![
            ("q", q),
            ("fl", format!("{CONTENT_ID_FIELD},score")),
            ("rows", self.max_results.to_string()),
            ("sort", format!("score desc,{CONTENT_ID_FIELD} asc")),
            ("facet", "true".to_string()),
            ("facet.field", CATEGORY_FIELD.to_string()),
            ("facet.limit", "-1".to_string()),
            ("facet.mincount", "1".to_string()),
            ("wt", "json".to_string()),
        ]
    }
}

#[async_trait]
impl ContentSearcher for RemoteSearch {
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        if self.is_closed() {
            return Err(Error::closed(format!("remote search for core {}", self.core())));
        }

        let tree = self.builder.build_query(query);
        self.check_fields(&tree)?;
        let q = render(&tree);
        log::debug!("Remote search on {}: {q}", self.core());

        let response: SelectResponse = self.client.get_json("select", &self.params(q)).await?;

        let hits = response
            .response
            .docs
            .into_iter()
            .take(self.max_results)
            .map(|hit| (hit.score, hit.id))
            .collect();
        let ids = rank(hits);

        let raw = response
            .facet_counts
            .and_then(|f| f.facet_fields.get(CATEGORY_FIELD).map(|v| parse_facet_list(v)))
            .unwrap_or_default();
        let requests = build_facet_requests(&query.categories, self.max_results);
        let facets = facet::aggregate(&requests, &raw, self.categories.as_ref());

        Ok(SearchOutcome { ids, facets })
    }

    async fn close(&self) -> Result<()> {
        // The client belongs to the tenant; only this searcher is retired.
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::debug!("Closed remote search for core {}", self.core());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

impl std::fmt::Debug for RemoteSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSearch")
            .field("client", &self.client)
            .field("max_results", &self.max_results)
            .field("languages", &self.languages)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
