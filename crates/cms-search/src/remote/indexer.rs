//! Indexer for the remote index service.
//!
//! Documents are posted as JSON to `{address}/{core}/update`. Categories are
//! expanded to every ancestor so the service can count hierarchically with a
//! flat field.

use std::sync::Arc;

use cms_search_core::{Error, Result, normalize_group};
use serde_json::{Map, Value, json};

use crate::document::{CATEGORY_FIELD, CONTENT_ID_FIELD, GROUP_FIELD, IndexedDocument};
use crate::language::LanguageSource;
use crate::remote::client::RemoteClient;

/// Writes documents to one core of the remote index service.
pub struct RemoteIndexer {
    client: RemoteClient,
    languages: Arc<dyn LanguageSource>,
}

impl RemoteIndexer {
    /// Create an indexer that borrows `client`.
    pub fn new(client: RemoteClient, languages: Arc<dyn LanguageSource>) -> Self {
        Self { client, languages }
    }

    /// Add or replace documents. Not searchable until [`commit`](Self::commit).
    pub async fn add_documents(&self, docs: &[IndexedDocument]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let codes = self.languages.language_codes();
        let body = docs
            .iter()
            .map(|doc| to_json(doc, &codes))
            .collect::<Result<Vec<_>>>()?;
        self.update(&Value::Array(body)).await?;
        log::debug!("Posted {} documents to core {}", docs.len(), self.client.core());
        Ok(())
    }

    /// Add or replace one document.
    pub async fn add_document(&self, doc: &IndexedDocument) -> Result<()> {
        self.add_documents(std::slice::from_ref(doc)).await
    }

    /// Delete a document by identifier.
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        self.update(&json!({ "delete": { "id": id } })).await
    }

    /// Delete every document of the core.
    pub async fn delete_all(&self) -> Result<()> {
        self.update(&json!({ "delete": { "query": "*:*" } })).await?;
        log::info!("Deleted all documents of core {}", self.client.core());
        Ok(())
    }

    /// Make pending changes searchable.
    pub async fn commit(&self) -> Result<()> {
        self.update(&json!({ "commit": {} })).await
    }

    async fn update(&self, body: &Value) -> Result<()> {
        let _: Value = self
            .client
            .post_json("update", &[("wt", "json".to_string())], body)
            .await?;
        Ok(())
    }
}

fn to_json(doc: &IndexedDocument, languages: &[String]) -> Result<Value> {
    doc.validate()?;
    let mut out = Map::new();
    out.insert(CONTENT_ID_FIELD.to_string(), json!(doc.id));
    for (lang, text) in &doc.texts {
        if !languages.contains(lang) {
            return Err(Error::UnknownField {
                field: lang.clone(),
            });
        }
        out.insert(lang.clone(), json!(text));
    }
    let groups: Vec<String> = doc.groups.iter().map(|g| normalize_group(g)).collect();
    out.insert(GROUP_FIELD.to_string(), json!(groups));

    let mut paths: Vec<String> = doc
        .categories
        .iter()
        .flat_map(|c| c.with_ancestors())
        .filter(|c| !c.is_root())
        .map(|c| c.to_string())
        .collect();
    paths.sort();
    paths.dedup();
    if !paths.is_empty() {
        out.insert(CATEGORY_FIELD.to_string(), json!(paths));
    }
    Ok(Value::Object(out))
}

impl std::fmt::Debug for RemoteIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteIndexer")
            .field("client", &self.client)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
