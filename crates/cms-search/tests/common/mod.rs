//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use cms_search::{Category, IndexedDocument};

/// Parse a category path.
pub fn cat(path: &str) -> Category {
    Category::parse(path).unwrap()
}

/// An English document filed under the given groups and categories.
pub fn doc(id: &str, text: &str, groups: &[&str], categories: &[&str]) -> IndexedDocument {
    let mut builder = IndexedDocument::builder().id(id).text("en", text);
    for group in groups {
        builder = builder.group(group);
    }
    for category in categories {
        builder = builder.category(cat(category));
    }
    builder.build()
}

/// A `select` answer of the remote service.
pub fn select_response(ids: &[&str], facets: &[(&str, u64)]) -> serde_json::Value {
    let docs: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({ "id": id, "score": 1.0 }))
        .collect();
    let flat: Vec<serde_json::Value> = facets
        .iter()
        .flat_map(|(path, count)| [serde_json::json!(path), serde_json::json!(count)])
        .collect();
    serde_json::json!({
        "response": { "numFound": ids.len(), "docs": docs },
        "facet_counts": { "facet_fields": { "category": flat } }
    })
}

#[cfg(feature = "local")]
pub use local::LocalFixture;

#[cfg(feature = "local")]
mod local {
    use cms_search::{IndexedDocument, LocalIndexer, LocalSearch, SearchConfig};
    use tempfile::TempDir;

    /// Index and taxonomy directories populated with documents.
    pub struct LocalFixture {
        pub index_dir: TempDir,
        pub taxonomy_dir: TempDir,
    }

    impl LocalFixture {
        /// Index `docs` in English and commit.
        pub fn new(docs: &[IndexedDocument]) -> Self {
            let index_dir = tempfile::tempdir().unwrap();
            let taxonomy_dir = tempfile::tempdir().unwrap();
            let mut indexer =
                LocalIndexer::open(index_dir.path(), taxonomy_dir.path(), &["en"]).unwrap();
            for doc in docs {
                indexer.add_document(doc).unwrap();
            }
            indexer.commit().unwrap();
            Self {
                index_dir,
                taxonomy_dir,
            }
        }

        /// Backend with default settings.
        pub fn search(&self) -> LocalSearch {
            LocalSearch::init(self.index_dir.path(), self.taxonomy_dir.path()).unwrap()
        }

        /// Configuration pointing at the fixture directories.
        pub fn config(&self) -> SearchConfig {
            SearchConfig {
                index_path: Some(self.index_dir.path().display().to_string()),
                taxonomy_path: Some(self.taxonomy_dir.path().display().to_string()),
                ..Default::default()
            }
        }
    }
}
