//! Query construction.
//!
//! [`QueryBuilder`] turns a [`TermMap`] and the caller's allowed groups into a
//! backend-neutral [`QueryTree`]. Each backend renders the tree into its own
//! query representation.
//!
//! # Multi-word values
//!
//! A value such as `"Venice Amsterdam"` is split on whitespace. How the words
//! combine is the [`WordMode`] contract: with the default [`WordMode::All`]
//! every word must appear in the field; with [`WordMode::Any`] one is enough.
//! Fields always combine conjunctively.

use std::collections::{BTreeMap, BTreeSet};

use cms_search_core::split_words;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::document::GROUP_FIELD;
use crate::group::{GroupPolicy, Visibility};

/// Field identifier (language code) → raw query string.
pub type TermMap = BTreeMap<String, String>;

/// How the words of one multi-word value combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordMode {
    /// Every word must match the field (conjunction).
    #[default]
    All,
    /// Any word may match the field (alternation).
    Any,
}

/// A backend-neutral boolean query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTree {
    /// Matches every document.
    MatchAll,
    /// The field must contain this exact, already-normalized value.
    Term {
        /// Field identifier
        field: String,
        /// Normalized value
        value: String,
    },
    /// Every clause must match.
    All(Vec<QueryTree>),
    /// At least one clause must match.
    Any(Vec<QueryTree>),
}

impl QueryTree {
    /// Term clause.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Conjunction; an empty conjunction matches everything and a single
    /// clause stands for itself.
    pub fn all(mut clauses: Vec<QueryTree>) -> Self {
        match clauses.len() {
            0 => Self::MatchAll,
            1 => clauses.remove(0),
            _ => Self::All(clauses),
        }
    }

    /// Disjunction; a single clause stands for itself.
    pub fn any(mut clauses: Vec<QueryTree>) -> Self {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Self::Any(clauses)
        }
    }

    /// Field identifiers referenced anywhere in the tree.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::MatchAll => {}
            Self::Term { field, .. } => {
                out.insert(field.as_str());
            }
            Self::All(clauses) | Self::Any(clauses) => {
                for clause in clauses {
                    clause.collect_fields(out);
                }
            }
        }
    }
}

/// A single search request.
///
/// Constructed per call and never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Words to look for, per field.
    #[serde(default)]
    pub terms: TermMap,
    /// Categories to report facet counts for; empty means the whole taxonomy.
    #[serde(default)]
    pub categories: BTreeSet<Category>,
    /// Groups the caller may see.
    #[serde(default)]
    pub allowed_groups: BTreeSet<String>,
}

impl SearchQuery {
    /// Single-field query: one language code and its words.
    pub fn word<I, S>(lang_code: &str, word: &str, allowed_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: TermMap::from([(lang_code.to_string(), word.to_string())]),
            categories: BTreeSet::new(),
            allowed_groups: allowed_groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a term entry.
    pub fn with_term(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms.insert(field.into(), value.into());
        self
    }

    /// Add a facet category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category);
        self
    }

    /// Add an allowed group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.allowed_groups.insert(group.into());
        self
    }
}

/// Builds [`QueryTree`]s from term maps and group policy.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    mode: WordMode,
    policy: GroupPolicy,
}

impl QueryBuilder {
    /// Create a builder.
    pub fn new(mode: WordMode, policy: GroupPolicy) -> Self {
        Self { mode, policy }
    }

    /// Multi-word semantics in use.
    pub fn mode(&self) -> WordMode {
        self.mode
    }

    /// Build the query for a term map and a set of allowed groups.
    ///
    /// Values with no words contribute no clause. The group clause is omitted
    /// when the policy resolves to [`Visibility::Unrestricted`].
    pub fn build<I, S>(&self, terms: &TermMap, allowed_groups: I) -> QueryTree
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut clauses = Vec::with_capacity(terms.len() + 1);

        for (field, value) in terms {
            let words: Vec<QueryTree> = split_words(value)
                .into_iter()
                .map(|word| QueryTree::term(field.as_str(), word))
                .collect();
            if words.is_empty() {
                continue;
            }
            clauses.push(match self.mode {
                WordMode::All => QueryTree::all(words),
                WordMode::Any => QueryTree::any(words),
            });
        }

        if let Visibility::Groups(groups) = self.policy.visibility(allowed_groups) {
            let group_clauses = groups
                .into_iter()
                .map(|group| QueryTree::term(GROUP_FIELD, group))
                .collect();
            clauses.push(QueryTree::any(group_clauses));
        }

        QueryTree::all(clauses)
    }

    /// Build the query for a [`SearchQuery`].
    pub fn build_query(&self, query: &SearchQuery) -> QueryTree {
        self.build(&query.terms, &query.allowed_groups)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(entries: &[(&str, &str)]) -> TermMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const NO_GROUPS: [&str; 0] = [];

    #[test]
    fn test_multi_word_is_conjunction_by_default() {
        let q = QueryBuilder::default()
            .build(&terms(&[("en", "Venice Amsterdam")]), ["administrators"]);
        assert_eq!(
            q,
            QueryTree::All(vec![
                QueryTree::term("en", "venice"),
                QueryTree::term("en", "amsterdam"),
            ])
        );
    }

    #[test]
    fn test_multi_word_any_mode() {
        let builder = QueryBuilder::new(WordMode::Any, GroupPolicy::default());
        let q = builder.build(&terms(&[("en", "Venice Amsterdam")]), ["administrators"]);
        assert_eq!(
            q,
            QueryTree::Any(vec![
                QueryTree::term("en", "venice"),
                QueryTree::term("en", "amsterdam"),
            ])
        );
    }

    #[test]
    fn test_default_group_clause_is_free() {
        let q = QueryBuilder::default().build(&terms(&[("en", "Venice")]), NO_GROUPS);
        assert_eq!(
            q,
            QueryTree::All(vec![
                QueryTree::term("en", "venice"),
                QueryTree::term(GROUP_FIELD, "free"),
            ])
        );
    }

    #[test]
    fn test_group_clause_is_disjunction() {
        let q = QueryBuilder::default().build(&terms(&[("en", "x")]), ["Editors"]);
        assert_eq!(
            q,
            QueryTree::All(vec![
                QueryTree::term("en", "x"),
                QueryTree::Any(vec![
                    QueryTree::term(GROUP_FIELD, "editors"),
                    QueryTree::term(GROUP_FIELD, "free"),
                ]),
            ])
        );
    }

    #[test]
    fn test_admins_omit_group_clause() {
        let q = QueryBuilder::default()
            .build(&terms(&[("en", "x")]), ["editors", "administrators"]);
        assert_eq!(q, QueryTree::term("en", "x"));
        assert!(!q.fields().contains(GROUP_FIELD));
    }

    #[test]
    fn test_fields_combine_conjunctively() {
        let q = QueryBuilder::default()
            .build(&terms(&[("en", "a"), ("it", "b")]), ["administrators"]);
        assert_eq!(
            q,
            QueryTree::All(vec![QueryTree::term("en", "a"), QueryTree::term("it", "b")])
        );
    }

    #[test]
    fn test_blank_value_contributes_nothing() {
        let q = QueryBuilder::default().build(&terms(&[("en", "   ")]), ["administrators"]);
        assert_eq!(q, QueryTree::MatchAll);
    }

    #[test]
    fn test_empty_terms_is_visibility_only() {
        let q = QueryBuilder::default().build(&TermMap::new(), NO_GROUPS);
        assert_eq!(q, QueryTree::term(GROUP_FIELD, "free"));
    }

    #[test]
    fn test_fields_lists_referenced_fields() {
        let q = QueryBuilder::default().build(&terms(&[("en", "a b"), ("it", "c")]), NO_GROUPS);
        let fields: Vec<&str> = q.fields().into_iter().collect();
        assert_eq!(fields, vec!["en", GROUP_FIELD, "it"]);
    }

    #[test]
    fn test_search_query_word() {
        let q = SearchQuery::word("en", "Venice", ["free"]);
        assert_eq!(q.terms.get("en").map(String::as_str), Some("Venice"));
        assert!(q.categories.is_empty());
        assert!(q.allowed_groups.contains("free"));
    }

    #[test]
    fn test_word_mode_serde() {
        assert_eq!(serde_json::to_string(&WordMode::Any).unwrap_or_default(), "\"any\"");
        assert_eq!(WordMode::default(), WordMode::All);
    }
}
