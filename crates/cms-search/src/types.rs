//! Search configuration.
//!
//! These types are always available regardless of feature flags. A
//! configuration is usually read from TOML:
//!
//! ```toml
//! backend = "remote"
//! max_results = 500
//! languages = ["en", "it"]
//!
//! [remote]
//! address = "http://localhost:8983/solr"
//! core = "tenant-a"
//! ```

use std::path::Path;

use cms_search_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::facet::DEFAULT_MAX_RESULTS;
use crate::group::GroupPolicy;
use crate::query::WordMode;

/// Which backend serves searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Embedded index opened from local directories on every call.
    #[default]
    Local,
    /// Shared multi-tenant index service reached over HTTP.
    Remote,
}

/// Connection settings for the remote index service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base address of the service, e.g. `http://localhost:8983/solr`.
    pub address: String,

    /// Tenant/core name.
    pub core: String,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Socket (whole request) timeout in milliseconds.
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_socket_timeout_ms() -> u64 {
    60_000
}

impl RemoteConfig {
    /// Settings for an address and core with default timeouts.
    pub fn new(address: impl Into<String>, core: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            core: core.into(),
            connect_timeout_ms: default_connect_timeout_ms(),
            socket_timeout_ms: default_socket_timeout_ms(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory of the embedded index.
    #[serde(default)]
    pub index_path: Option<String>,

    /// Directory of the embedded taxonomy.
    #[serde(default)]
    pub taxonomy_path: Option<String>,

    /// Cap on ranked identifiers and facet counts.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Multi-word value semantics.
    #[serde(default)]
    pub word_mode: WordMode,

    /// Language codes that get a text field.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Reserved group names.
    #[serde(default)]
    pub groups: GroupPolicy,

    /// Remote service settings (remote backend only).
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            index_path: None,
            taxonomy_path: None,
            max_results: default_max_results(),
            word_mode: WordMode::default(),
            languages: default_languages(),
            groups: GroupPolicy::default(),
            remote: None,
        }
    }
}

impl SearchConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read configuration {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(Error::config("max_results must be greater than zero"));
        }
        if self.languages.is_empty() {
            return Err(Error::config("at least one language is required"));
        }
        if let Some(remote) = &self.remote {
            if remote.address.trim().is_empty() {
                return Err(Error::config("remote.address must not be empty"));
            }
            if remote.core.trim().is_empty() {
                return Err(Error::config("remote.core must not be empty"));
            }
        }
        if self.backend == BackendKind::Remote && self.remote.is_none() {
            return Err(Error::config("remote backend requires a [remote] section"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.max_results, 1000);
        assert_eq!(config.word_mode, WordMode::All);
        assert_eq!(config.languages, vec!["en"]);
        assert_eq!(config.groups.free_group, "free");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_with_defaults() {
        let config = SearchConfig::from_toml_str(
            r#"
            index_path = "/var/index"
            taxonomy_path = "/var/taxo"
            "#,
        )
        .unwrap();
        assert_eq!(config.index_path.as_deref(), Some("/var/index"));
        assert_eq!(config.max_results, 1000);
    }

    #[test]
    fn test_from_toml_remote() {
        let config = SearchConfig::from_toml_str(
            r#"
            backend = "remote"
            word_mode = "any"
            languages = ["en", "it"]

            [remote]
            address = "http://localhost:8983/solr"
            core = "tenant-a"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Remote);
        assert_eq!(config.word_mode, WordMode::Any);
        let remote = config.remote.unwrap();
        assert_eq!(remote.core, "tenant-a");
        assert_eq!(remote.connect_timeout_ms, 10_000);
        assert_eq!(remote.socket_timeout_ms, 60_000);
    }

    #[test]
    fn test_validate_rejects_zero_max_results() {
        let err = SearchConfig::from_toml_str("max_results = 0").unwrap_err();
        assert!(err.to_string().contains("max_results"));
    }

    #[test]
    fn test_validate_rejects_remote_without_section() {
        let err = SearchConfig::from_toml_str("backend = \"remote\"").unwrap_err();
        assert!(err.to_string().contains("[remote]"));
    }

    #[test]
    fn test_validate_rejects_blank_core() {
        let config = SearchConfig {
            backend: BackendKind::Remote,
            remote: Some(RemoteConfig::new("http://x", " ")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SearchConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
