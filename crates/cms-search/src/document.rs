//! Indexed document representation.
//!
//! [`IndexedDocument`] is the already-built index form of a content record:
//! its identifier, one text per language, its category paths and its access
//! groups. Field names are a fixed contract between the indexers and the
//! searchers of both backends.
//!
//! ```rust
//! use cms_search::{Category, IndexedDocument};
//!
//! let doc = IndexedDocument::builder()
//!     .id("ART1")
//!     .text("en", "Venice in winter")
//!     .text("it", "Venezia d'inverno")
//!     .category(Category::parse("/travel/italy").unwrap())
//!     .group("Free")
//!     .build();
//!
//! assert_eq!(doc.groups, vec!["free"]);
//! ```

use std::collections::BTreeMap;

use cms_search_core::{Error, Result, normalize_group};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::group::FREE_GROUP;

/// Field holding the content identifier.
pub const CONTENT_ID_FIELD: &str = "id";

/// Field holding the (lowercased) access groups.
pub const GROUP_FIELD: &str = "group";

/// Field holding the category paths.
pub const CATEGORY_FIELD: &str = "category";

/// Field names reserved by the engine; language codes may not use them.
pub const RESERVED_FIELDS: [&str; 3] = [CONTENT_ID_FIELD, GROUP_FIELD, CATEGORY_FIELD];

/// A content record in index form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Unique content identifier.
    pub id: String,
    /// Language code → text.
    #[serde(default)]
    pub texts: BTreeMap<String, String>,
    /// Category paths the content is filed under.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Normalized access groups.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl IndexedDocument {
    /// Create a document builder.
    pub fn builder() -> IndexedDocumentBuilder {
        IndexedDocumentBuilder::default()
    }

    /// Check the document can be indexed.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::config("document has no content identifier"));
        }
        if self.texts.is_empty() {
            return Err(Error::config(format!("document '{}' has no text field", self.id)));
        }
        if self.groups.is_empty() {
            return Err(Error::config(format!("document '{}' has no group", self.id)));
        }
        if let Some(reserved) = self.texts.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
            return Err(Error::config(format!(
                "document '{}' uses reserved field '{reserved}' as a language",
                self.id
            )));
        }
        Ok(())
    }
}

/// Builder for [`IndexedDocument`].
///
/// Groups are normalized as they are added. A document built without any
/// group is filed under the free group.
#[derive(Debug, Default)]
pub struct IndexedDocumentBuilder {
    doc: IndexedDocument,
}

impl IndexedDocumentBuilder {
    /// Set the content identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.doc.id = id.into();
        self
    }

    /// Set the text for a language.
    pub fn text(mut self, lang_code: impl Into<String>, text: impl Into<String>) -> Self {
        self.doc.texts.insert(lang_code.into(), text.into());
        self
    }

    /// Add a category path.
    pub fn category(mut self, category: Category) -> Self {
        if !self.doc.categories.contains(&category) {
            self.doc.categories.push(category);
        }
        self
    }

    /// Add an access group.
    pub fn group(mut self, group: impl AsRef<str>) -> Self {
        let group = normalize_group(group.as_ref());
        if !group.is_empty() && !self.doc.groups.contains(&group) {
            self.doc.groups.push(group);
        }
        self
    }

    /// Finish the document.
    pub fn build(mut self) -> IndexedDocument {
        if self.doc.groups.is_empty() {
            self.doc.groups.push(FREE_GROUP.to_string());
        }
        self.doc
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalizes_groups() {
        let doc = IndexedDocument::builder()
            .id("1")
            .text("en", "x")
            .group("Editors")
            .group("EDITORS")
            .build();
        assert_eq!(doc.groups, vec!["editors"]);
    }

    #[test]
    fn test_builder_defaults_to_free_group() {
        let doc = IndexedDocument::builder().id("1").text("en", "x").build();
        assert_eq!(doc.groups, vec![FREE_GROUP]);
    }

    #[test]
    fn test_builder_dedupes_categories() {
        let c = Category::parse("/a").unwrap();
        let doc = IndexedDocument::builder()
            .id("1")
            .category(c.clone())
            .category(c)
            .build();
        assert_eq!(doc.categories.len(), 1);
    }

    #[test]
    fn test_validate() {
        let ok = IndexedDocument::builder().id("1").text("en", "x").build();
        assert!(ok.validate().is_ok());

        let no_id = IndexedDocument::builder().text("en", "x").build();
        assert!(no_id.validate().is_err());

        let no_text = IndexedDocument::builder().id("1").build();
        assert!(no_text.validate().is_err());

        let reserved = IndexedDocument::builder().id("1").text("group", "x").build();
        assert!(reserved.validate().unwrap_err().to_string().contains("reserved"));
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let doc = IndexedDocument::builder()
            .id("7")
            .text("en", "hello")
            .category(Category::parse("/a/b").unwrap())
            .build();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["categories"][0], "/a/b");
        assert_eq!(json["groups"][0], "free");
    }
}
