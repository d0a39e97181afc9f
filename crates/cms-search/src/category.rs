//! Hierarchical category paths and the category tree.
//!
//! A [`Category`] is held as its ordered path segments and rendered as a
//! delimited absolute string (`/news/sport`). The [`TaxonomyTree`] stores a
//! set of categories as a prefix tree so ancestor/child lookups never parse
//! strings.

use std::collections::BTreeMap;
use std::fmt;

use cms_search_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Delimiter used when rendering paths for the index and the wire.
pub const PATH_DELIMITER: char = '/';

// ============================================================================
// Category
// ============================================================================

/// A category path.
///
/// The empty path is the taxonomy root and renders as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category {
    segments: Vec<String>,
}

impl Category {
    /// The taxonomy root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-delimited path. The leading delimiter is optional.
    pub fn parse(path: &str) -> Result<Self> {
        Self::parse_with(path, PATH_DELIMITER)
    }

    /// Parse a path rendered with an arbitrary delimiter.
    pub fn parse_with(path: &str, delimiter: char) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_category(path, "empty path"));
        }
        let rest = path.strip_prefix(delimiter).unwrap_or(path);
        if rest.is_empty() {
            return Ok(Self::root());
        }
        Self::from_segments(rest.split(delimiter)).map_err(|e| match e {
            Error::InvalidCategory { reason, .. } => Error::invalid_category(path, reason),
            other => other,
        })
    }

    /// Build a category from its segments, root first.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() {
                return Err(Error::invalid_category(out.join("/"), "empty segment"));
            }
            if segment.contains(PATH_DELIMITER) {
                return Err(Error::invalid_category(
                    segment,
                    format!("segment contains '{PATH_DELIMITER}'"),
                ));
            }
            out.push(segment.to_string());
        }
        Ok(Self { segments: out })
    }

    /// Path segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the taxonomy root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parent category; `None` for the root.
    pub fn parent(&self) -> Option<Category> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Direct child with the given segment.
    pub fn child(&self, segment: &str) -> Result<Category> {
        Self::from_segments(self.segments.iter().map(String::as_str).chain([segment]))
    }

    /// This category and every ancestor below the root, shallowest first.
    pub fn with_ancestors(&self) -> Vec<Category> {
        (1..=self.segments.len())
            .map(|n| Self {
                segments: self.segments[..n].to_vec(),
            })
            .collect()
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Category) -> bool {
        self.segments.len() < other.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// Render the absolute path with the given delimiter.
    pub fn path(&self, delimiter: char) -> String {
        let mut out = String::new();
        if self.is_root() {
            out.push(delimiter);
        }
        for segment in &self.segments {
            out.push(delimiter);
            out.push_str(segment);
        }
        out
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path(PATH_DELIMITER))
    }
}

impl TryFrom<String> for Category {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// CategorySource
// ============================================================================

/// Read access to a category taxonomy.
///
/// The embedded backend reads it from the taxonomy directory on every call;
/// the remote backend is handed one by the application's category service.
pub trait CategorySource: Send + Sync {
    /// Returns `true` if the category exists. The root always exists.
    fn contains(&self, category: &Category) -> bool;

    /// Direct children of a category, in path order.
    fn children(&self, category: &Category) -> Vec<Category>;
}

// ============================================================================
// TaxonomyTree
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    children: BTreeMap<String, Node>,
}

impl Node {
    fn count(&self) -> usize {
        self.children.values().map(|c| 1 + c.count()).sum()
    }

    fn collect(&self, prefix: &mut Vec<String>, out: &mut Vec<Category>) {
        for (segment, child) in &self.children {
            prefix.push(segment.clone());
            out.push(Category {
                segments: prefix.clone(),
            });
            child.collect(prefix, out);
            prefix.pop();
        }
    }
}

/// Prefix tree of category paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Category>", into = "Vec<Category>")]
pub struct TaxonomyTree {
    root: Node,
}

impl TaxonomyTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a category and, implicitly, all its ancestors.
    ///
    /// Returns `true` if the category was not present before.
    pub fn insert(&mut self, category: &Category) -> bool {
        let mut node = &mut self.root;
        let mut added = false;
        for segment in category.segments() {
            node = node.children.entry(segment.clone()).or_insert_with(|| {
                added = true;
                Node::default()
            });
        }
        added
    }

    fn find(&self, category: &Category) -> Option<&Node> {
        category
            .segments()
            .iter()
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    /// Number of categories, root excluded.
    pub fn len(&self) -> usize {
        self.root.count()
    }

    /// Returns `true` if no category has been inserted.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Every category, depth first in path order.
    pub fn categories(&self) -> Vec<Category> {
        let mut out = Vec::with_capacity(self.len());
        self.root.collect(&mut Vec::new(), &mut out);
        out
    }
}

impl CategorySource for TaxonomyTree {
    fn contains(&self, category: &Category) -> bool {
        self.find(category).is_some()
    }

    fn children(&self, category: &Category) -> Vec<Category> {
        self.find(category)
            .map(|node| {
                node.children
                    .keys()
                    .map(|segment| Category {
                        segments: category
                            .segments()
                            .iter()
                            .cloned()
                            .chain([segment.clone()])
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Vec<Category>> for TaxonomyTree {
    fn from(categories: Vec<Category>) -> Self {
        let mut tree = Self::new();
        for category in &categories {
            tree.insert(category);
        }
        tree
    }
}

impl From<TaxonomyTree> for Vec<Category> {
    fn from(tree: TaxonomyTree) -> Self {
        tree.categories()
    }
}

// ============================================================================
// Tests
// ============================================================================
