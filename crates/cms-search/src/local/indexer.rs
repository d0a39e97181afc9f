//! Embedded index writer.
//!
//! [`LocalIndexer`] owns the tantivy `IndexWriter` of an index directory and
//! the [`TaxonomyWriter`] of its taxonomy directory, and keeps the two in step:
//! every committed category is present in the taxonomy.
//!
//! ```rust,ignore
//! use cms_search::{IndexedDocument, LocalIndexer};
//!
//! let mut indexer = LocalIndexer::open(&index_dir, &taxonomy_dir, &["en"])?;
//! indexer.add_document(&IndexedDocument::builder()
//!     .id("1")
//!     .text("en", "Venice")
//!     .group("free")
//!     .build())?;
//! indexer.commit()?;
//! ```

use std::path::Path;

use cms_search_core::{Error, Result, normalize_group};
use tantivy::schema::Facet;
use tantivy::{Index, IndexWriter, TantivyDocument, Term};

use crate::document::IndexedDocument;
use crate::local::schema::IndexSchema;
use crate::local::taxonomy::TaxonomyWriter;

/// Index writer buffer size (50MB).
const WRITER_BUFFER_SIZE: usize = 50_000_000;

/// Writer for an embedded index and its taxonomy.
pub struct LocalIndexer {
    index: Index,
    writer: IndexWriter,
    schema: IndexSchema,
    taxonomy: TaxonomyWriter,
}

impl LocalIndexer {
    /// Create or open the index in `index_path` and the taxonomy in
    /// `taxonomy_path`.
    ///
    /// An existing index keeps its own language fields; `languages` only
    /// applies when the index is created.
    pub fn open<S: AsRef<str>>(
        index_path: &Path,
        taxonomy_path: &Path,
        languages: &[S],
    ) -> Result<Self> {
        if !index_path.exists() {
            std::fs::create_dir_all(index_path)?;
        }

        let index = if index_path.join("meta.json").exists() {
            Index::open_in_dir(index_path)
                .map_err(|e| Error::setup_with_source("Failed to open index", e))?
        } else {
            let schema = IndexSchema::build(languages)?;
            Index::create_in_dir(index_path, schema.schema().clone())
                .map_err(|e| Error::setup_with_source("Failed to create index", e))?
        };
        IndexSchema::register_tokenizers(&index);
        let schema = IndexSchema::from_index(&index)?;

        let writer = index
            .writer(WRITER_BUFFER_SIZE)
            .map_err(|e| Error::setup_with_source("Failed to create index writer", e))?;
        let taxonomy = TaxonomyWriter::open(taxonomy_path)?;

        log::info!(
            "Opened index writer on {} (taxonomy {})",
            index_path.display(),
            taxonomy_path.display()
        );

        Ok(Self {
            index,
            writer,
            schema,
            taxonomy,
        })
    }

    /// Stage a document, replacing any document with the same identifier.
    ///
    /// Not searchable until [`commit`](Self::commit).
    pub fn add_document(&mut self, doc: &IndexedDocument) -> Result<()> {
        doc.validate()?;
        let tantivy_doc = self.convert(doc)?;
        self.writer
            .delete_term(Term::from_field_text(self.schema.id, &doc.id));
        self.writer
            .add_document(tantivy_doc)
            .map_err(|e| Error::search_with_source("Failed to add document", e))?;
        for category in &doc.categories {
            self.taxonomy.add(category);
        }
        Ok(())
    }

    /// Stage the removal of a document.
    pub fn delete_document(&mut self, id: &str) {
        self.writer
            .delete_term(Term::from_field_text(self.schema.id, id));
    }

    /// Make staged changes searchable and persist the taxonomy.
    pub fn commit(&mut self) -> Result<()> {
        self.writer
            .commit()
            .map_err(|e| Error::search_with_source("Failed to commit index", e))?;
        self.taxonomy.commit()
    }

    /// Remove every document and category.
    pub fn clear(&mut self) -> Result<()> {
        self.writer
            .delete_all_documents()
            .map_err(|e| Error::search_with_source("Failed to clear index", e))?;
        self.taxonomy.clear();
        self.commit()
    }

    /// The underlying tantivy index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Typed schema of the index.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    fn convert(&self, doc: &IndexedDocument) -> Result<TantivyDocument> {
        let s = &self.schema;
        let mut out = TantivyDocument::new();

        out.add_text(s.id, &doc.id);
        for (lang, text) in &doc.texts {
            let field = s.language(lang).ok_or_else(|| Error::UnknownField {
                field: lang.clone(),
            })?;
            out.add_text(field, text);
        }
        for group in &doc.groups {
            out.add_text(s.group, normalize_group(group));
        }
        for category in doc.categories.iter().filter(|c| !c.is_root()) {
            out.add_facet(s.category, Facet::from_path(category.segments()));
        }

        Ok(out)
    }
}

impl std::fmt::Debug for LocalIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIndexer")
            .field("schema", &self.schema)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::category::{Category, CategorySource};
    use crate::local::taxonomy::TaxonomyReader;

    fn doc(id: &str) -> IndexedDocument {
        IndexedDocument::builder()
            .id(id)
            .text("en", format!("Document {id}"))
            .category(Category::parse("/news/sport").unwrap())
            .group("free")
            .build()
    }

    fn num_docs(indexer: &LocalIndexer) -> u64 {
        let reader = indexer.index().reader().unwrap();
        reader.reload().unwrap();
        reader.searcher().num_docs()
    }

    #[test]
    fn test_add_and_commit() {
        let index_dir = tempfile::tempdir().unwrap();
        let taxo_dir = tempfile::tempdir().unwrap();
        let mut indexer = LocalIndexer::open(index_dir.path(), taxo_dir.path(), &["en"]).unwrap();

        indexer.add_document(&doc("1")).unwrap();
        indexer.add_document(&doc("2")).unwrap();
        indexer.commit().unwrap();

        assert_eq!(num_docs(&indexer), 2);
        let taxonomy = TaxonomyReader::open(taxo_dir.path()).unwrap();
        assert!(taxonomy.contains(&Category::parse("/news/sport").unwrap()));
    }

    #[test]
    fn test_same_id_replaces() {
        let index_dir = tempfile::tempdir().unwrap();
        let taxo_dir = tempfile::tempdir().unwrap();
        let mut indexer = LocalIndexer::open(index_dir.path(), taxo_dir.path(), &["en"]).unwrap();

        indexer.add_document(&doc("1")).unwrap();
        indexer.commit().unwrap();
        indexer.add_document(&doc("1")).unwrap();
        indexer.commit().unwrap();

        assert_eq!(num_docs(&indexer), 1);
    }

    #[test]
    fn test_delete_and_clear() {
        let index_dir = tempfile::tempdir().unwrap();
        let taxo_dir = tempfile::tempdir().unwrap();
        let mut indexer = LocalIndexer::open(index_dir.path(), taxo_dir.path(), &["en"]).unwrap();

        indexer.add_document(&doc("1")).unwrap();
        indexer.add_document(&doc("2")).unwrap();
        indexer.commit().unwrap();
        indexer.delete_document("1");
        indexer.commit().unwrap();
        assert_eq!(num_docs(&indexer), 1);

        indexer.clear().unwrap();
        assert_eq!(num_docs(&indexer), 0);
        assert!(TaxonomyReader::open(taxo_dir.path()).unwrap().tree().is_empty());
    }

    #[test]
    fn test_unknown_language_rejected() {
        let index_dir = tempfile::tempdir().unwrap();
        let taxo_dir = tempfile::tempdir().unwrap();
        let mut indexer = LocalIndexer::open(index_dir.path(), taxo_dir.path(), &["en"]).unwrap();

        let fr = IndexedDocument::builder().id("1").text("fr", "bonjour").build();
        let err = indexer.add_document(&fr).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let index_dir = tempfile::tempdir().unwrap();
        let taxo_dir = tempfile::tempdir().unwrap();
        {
            let mut indexer =
                LocalIndexer::open(index_dir.path(), taxo_dir.path(), &["en", "it"]).unwrap();
            indexer.add_document(&doc("1")).unwrap();
            indexer.commit().unwrap();
        }
        let indexer = LocalIndexer::open(index_dir.path(), taxo_dir.path(), &["en"]).unwrap();
        assert!(indexer.schema().language("it").is_some());
        assert_eq!(num_docs(&indexer), 1);
    }
}
