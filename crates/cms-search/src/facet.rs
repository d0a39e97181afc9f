//! Hierarchical category counts.
//!
//! Facet counting runs in the same pass as ranking: a backend collects raw
//! per-category counts of the matched documents while it collects the top
//! ranked ones, then hands them to [`aggregate`] together with the
//! [`FacetRequest`]s built by [`build_facet_requests`].
//!
//! Each request reports its own category plus that category's direct
//! children. Counts are clamped to the request's `max_results`; beyond that
//! cap they are not exact.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::category::{Category, CategorySource};

/// Default cap for ranked results and facet counts.
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Count request for one category subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRequest {
    /// Category whose count and children counts are requested.
    pub category: Category,
    /// Cap applied to every reported count.
    pub max_results: usize,
}

/// One request per category, or a single root request when none are given.
pub fn build_facet_requests<'a, I>(categories: I, max_results: usize) -> Vec<FacetRequest>
where
    I: IntoIterator<Item = &'a Category>,
{
    let mut requests: Vec<FacetRequest> = categories
        .into_iter()
        .map(|category| FacetRequest {
            category: category.clone(),
            max_results,
        })
        .collect();
    if requests.is_empty() {
        requests.push(FacetRequest {
            category: Category::root(),
            max_results,
        });
    }
    requests
}

/// Categories whose direct children a backend must count to answer
/// `requests`: each requested category and its parent.
pub fn anchors(requests: &[FacetRequest]) -> BTreeSet<Category> {
    let mut out = BTreeSet::new();
    for request in requests {
        if let Some(parent) = request.category.parent() {
            out.insert(parent);
        }
        out.insert(request.category.clone());
    }
    out
}

/// Matched-document counts per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts(BTreeMap<Category, u64>);

impl FacetCounts {
    /// Count for a category, if reported.
    pub fn get(&self, category: &Category) -> Option<u64> {
        self.0.get(category).copied()
    }

    /// Number of reported categories.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reported counts in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Category, u64)> {
        self.0.iter().map(|(c, n)| (c, *n))
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<Category, u64> {
        self.0
    }
}

fn clamp(count: u64, max_results: usize) -> u64 {
    count.min(max_results as u64)
}

/// Turn raw per-category counts into the reported facet counts.
///
/// `raw` holds exact counts of matched documents for the categories the
/// backend saw. A requested category is reported when the taxonomy knows it
/// or when it was matched; its children come from the taxonomy and from
/// `raw`, zero when unmatched.
pub fn aggregate(
    requests: &[FacetRequest],
    raw: &BTreeMap<Category, u64>,
    taxonomy: &dyn CategorySource,
) -> FacetCounts {
    let mut out = BTreeMap::new();

    for request in requests {
        let category = &request.category;
        let cap = request.max_results;
        let known = taxonomy.contains(category) || raw.contains_key(category);
        if !known {
            log::debug!("Facet category {category} is not in the taxonomy");
            continue;
        }

        if !category.is_root() {
            let count = raw.get(category).copied().unwrap_or(0);
            out.insert(category.clone(), clamp(count, cap));
        }

        let mut children: BTreeSet<Category> = taxonomy.children(category).into_iter().collect();
        children.extend(
            raw.keys()
                .filter(|c| c.parent().as_ref() == Some(category))
                .cloned(),
        );
        for child in children {
            let count = raw.get(&child).copied().unwrap_or(0);
            out.insert(child, clamp(count, cap));
        }
    }

    FacetCounts(out)
}

// ============================================================================
// Tests
// ============================================================================
