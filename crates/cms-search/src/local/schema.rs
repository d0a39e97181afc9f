//! Embedded index schema.
//!
//! # Fields
//!
//! | Field | Type | Purpose |
//! |-------|------|---------|
//! | `id` | STRING, FAST, STORED | Content identifier, tie-break sort key |
//! | `group` | STRING | Lowercased access groups |
//! | `category` | facet | Category paths |
//! | one per language code | TEXT | Language-tagged text |
//!
//! Text fields use the `cms_text` analyzer (simple tokenizer → long-token
//! filter → lowercaser), so indexed terms are the lowercased words the query
//! builder produces.

use std::collections::BTreeMap;

use cms_search_core::{Error, Result};
use tantivy::Index;
use tantivy::schema::{
    FAST, FacetOptions, Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder,
    TextFieldIndexing, TextOptions,
};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};

use crate::document::{CATEGORY_FIELD, CONTENT_ID_FIELD, GROUP_FIELD, RESERVED_FIELDS};

/// Name of the analyzer registered for language fields.
pub const TEXT_TOKENIZER: &str = "cms_text";

/// Tokens longer than this are dropped.
const MAX_TOKEN_LEN: usize = 64;

/// Typed access to the fields of an embedded index.
#[derive(Clone)]
pub struct IndexSchema {
    schema: Schema,
    /// Content identifier.
    pub id: Field,
    /// Access groups.
    pub group: Field,
    /// Category facet.
    pub category: Field,
    languages: BTreeMap<String, Field>,
}

impl IndexSchema {
    /// Build a schema with one text field per language code.
    pub fn build<S: AsRef<str>>(languages: &[S]) -> Result<Self> {
        let mut builder = SchemaBuilder::new();

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TEXT_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let id = builder.add_text_field(CONTENT_ID_FIELD, STRING | FAST | STORED);
        let group = builder.add_text_field(GROUP_FIELD, STRING);
        let category = builder.add_facet_field(CATEGORY_FIELD, FacetOptions::default());

        let mut fields = BTreeMap::new();
        for code in languages {
            let code = code.as_ref();
            if code.trim().is_empty() || RESERVED_FIELDS.contains(&code) {
                return Err(Error::config(format!("invalid language code '{code}'")));
            }
            if fields.contains_key(code) {
                return Err(Error::config(format!("duplicate language code '{code}'")));
            }
            let field = builder.add_text_field(code, text_options.clone());
            fields.insert(code.to_string(), field);
        }
        if fields.is_empty() {
            return Err(Error::config("at least one language is required"));
        }

        Ok(Self {
            schema: builder.build(),
            id,
            group,
            category,
            languages: fields,
        })
    }

    /// Recover the typed schema of an existing index.
    pub fn from_index(index: &Index) -> Result<Self> {
        let schema = index.schema();
        let lookup = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| Error::setup(format!("index has no '{name}' field")))
        };
        let id = lookup(CONTENT_ID_FIELD)?;
        let group = lookup(GROUP_FIELD)?;
        let category = lookup(CATEGORY_FIELD)?;

        let languages = schema
            .fields()
            .filter(|(_, entry)| !RESERVED_FIELDS.contains(&entry.name()))
            .map(|(field, entry)| (entry.name().to_string(), field))
            .collect();

        Ok(Self {
            schema,
            id,
            group,
            category,
            languages,
        })
    }

    /// Underlying tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Register the text analyzer with an index.
    ///
    /// Must be called after creating or opening an index.
    pub fn register_tokenizers(index: &Index) {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .build();
        index.tokenizers().register(TEXT_TOKENIZER, analyzer);
    }

    /// Text field of a language.
    pub fn language(&self, code: &str) -> Option<Field> {
        self.languages.get(code).copied()
    }

    /// Configured language codes.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Field a query term may target: a language field, the group field or
    /// the content identifier.
    pub fn queryable(&self, name: &str) -> Option<Field> {
        match name {
            GROUP_FIELD => Some(self.group),
            CONTENT_ID_FIELD => Some(self.id),
            other => self.language(other),
        }
    }
}

impl std::fmt::Debug for IndexSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSchema")
            .field("languages", &self.languages.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
