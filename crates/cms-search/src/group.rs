//! Group visibility policy.
//!
//! Every indexed document carries one or more access groups. A search is
//! restricted to documents whose group is among the caller's allowed groups,
//! with two reserved identifiers:
//!
//! - the free/public group is always allowed, and is the only allowed group
//!   when the caller supplies none;
//! - the administrators group lifts the restriction entirely.
//!
//! Identifiers are compared case-insensitively.

use std::collections::BTreeSet;

use cms_search_core::normalize_group;
use serde::{Deserialize, Serialize};

/// Reserved identifier of the administrators group.
pub const ADMINS_GROUP: &str = "administrators";

/// Reserved identifier of the free/public group.
pub const FREE_GROUP: &str = "free";

/// Reserved group identifiers used to resolve visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPolicy {
    /// Group whose members see every document.
    #[serde(default = "default_admins")]
    pub admins_group: String,
    /// Group every caller may see.
    #[serde(default = "default_free")]
    pub free_group: String,
}

fn default_admins() -> String {
    ADMINS_GROUP.to_string()
}

fn default_free() -> String {
    FREE_GROUP.to_string()
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            admins_group: default_admins(),
            free_group: default_free(),
        }
    }
}

/// Outcome of applying the policy to a caller's groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// No group filtering at all.
    Unrestricted,
    /// Documents must carry at least one of these normalized groups.
    Groups(BTreeSet<String>),
}

impl GroupPolicy {
    /// Resolve the visibility for a set of allowed groups.
    pub fn visibility<I, S>(&self, allowed_groups: I) -> Visibility
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admins = normalize_group(&self.admins_group);
        let mut groups: BTreeSet<String> = allowed_groups
            .into_iter()
            .map(|g| normalize_group(g.as_ref()))
            .filter(|g| !g.is_empty())
            .collect();

        if groups.contains(&admins) {
            return Visibility::Unrestricted;
        }
        groups.insert(normalize_group(&self.free_group));
        Visibility::Groups(groups)
    }
}

// ============================================================================
// Tests
// ============================================================================
