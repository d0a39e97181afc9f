//! Schema management on the remote index service.

use std::collections::BTreeSet;
use std::sync::Arc;

use cms_search_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::document::{CATEGORY_FIELD, CONTENT_ID_FIELD, GROUP_FIELD};
use crate::language::LanguageSource;
use crate::remote::client::RemoteClient;

/// Field type of language text fields on the service.
pub const TEXT_FIELD_TYPE: &str = "text_general";

/// Field type of raw string fields on the service.
pub const STRING_FIELD_TYPE: &str = "string";

/// A field definition as the service reports and accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name.
    pub name: String,
    /// Service field type.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether the field holds several values.
    #[serde(rename = "multiValued", default)]
    pub multi_valued: bool,
    /// Whether the value is stored.
    #[serde(default = "default_true")]
    pub stored: bool,
    /// Whether the value is indexed.
    #[serde(default = "default_true")]
    pub indexed: bool,
}

fn default_true() -> bool {
    true
}

impl FieldDefinition {
    fn string(name: &str, multi_valued: bool, stored: bool) -> Self {
        Self {
            name: name.to_string(),
            field_type: STRING_FIELD_TYPE.to_string(),
            multi_valued,
            stored,
            indexed: true,
        }
    }

    fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: TEXT_FIELD_TYPE.to_string(),
            multi_valued: false,
            stored: true,
            indexed: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FieldList {
    #[serde(default)]
    fields: Vec<FieldDefinition>,
}

/// Creates the fields the engine needs on one core.
pub struct RemoteSchema {
    client: RemoteClient,
    languages: Arc<dyn LanguageSource>,
}

impl RemoteSchema {
    /// Create a schema manager that borrows `client`.
    pub fn new(client: RemoteClient, languages: Arc<dyn LanguageSource>) -> Self {
        Self { client, languages }
    }

    /// Fields currently defined on the core.
    pub async fn fields(&self) -> Result<Vec<FieldDefinition>> {
        let list: FieldList = self
            .client
            .get_json("schema/fields", &[("wt", "json".to_string())])
            .await?;
        Ok(list.fields)
    }

    /// Fields the engine requires: identifier, group, category and one text
    /// field per configured language.
    pub fn required_fields(&self) -> Vec<FieldDefinition> {
        let mut out = vec![
            FieldDefinition::string(CONTENT_ID_FIELD, false, true),
            FieldDefinition::string(GROUP_FIELD, true, false),
            FieldDefinition::string(CATEGORY_FIELD, true, false),
        ];
        out.extend(
            self.languages
                .language_codes()
                .iter()
                .map(|code| FieldDefinition::text(code)),
        );
        out
    }

    /// Add the required fields that are missing.
    ///
    /// Returns the names of the fields that were added.
    pub async fn ensure_fields(&self) -> Result<Vec<String>> {
        let existing: BTreeSet<String> = self.fields().await?.into_iter().map(|f| f.name).collect();
        let missing: Vec<FieldDefinition> = self
            .required_fields()
            .into_iter()
            .filter(|f| !existing.contains(&f.name))
            .collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let _: serde_json::Value = self
            .client
            .post_json("schema", &[], &json!({ "add-field": missing }))
            .await?;
        let added: Vec<String> = missing.into_iter().map(|f| f.name).collect();
        log::info!(
            "Added fields {} to core {}",
            added.join(", "),
            self.client.core()
        );
        Ok(added)
    }
}

impl std::fmt::Debug for RemoteSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSchema")
            .field("client", &self.client)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
