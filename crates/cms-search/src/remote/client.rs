//! Shared HTTP handle to the remote index service.

use std::sync::Arc;
use std::time::Duration;

use cms_search_core::{Error, Result};
use parking_lot::RwLock;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::RemoteConfig;

/// Longest error body kept in [`Error::Remote`].
const MAX_ERROR_BODY: usize = 512;

struct ClientInner {
    address: String,
    core: String,
    http: RwLock<Option<Client>>,
}

/// Long-lived, cloneable handle to one core of the remote index service.
///
/// Clones share the same connection pool. The handle is owned by a tenant's
/// resources; searchers and indexers borrow it and never close it.
#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<ClientInner>,
}

impl RemoteClient {
    /// Build a handle from connection settings.
    ///
    /// # Errors
    ///
    /// A setup error if the address is not an `http(s)` URL, the core is
    /// blank, or the HTTP client cannot be built.
    pub fn connect(config: &RemoteConfig) -> Result<Self> {
        let url = Url::parse(config.address.trim()).map_err(|e| {
            Error::setup_with_source(format!("Invalid remote address '{}'", config.address), e)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::setup(format!(
                "Unsupported remote address scheme '{}'",
                url.scheme()
            )));
        }
        let core = config.core.trim();
        if core.is_empty() || core.contains('/') {
            return Err(Error::setup(format!("Invalid core name '{}'", config.core)));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.socket_timeout_ms))
            .build()
            .map_err(|e| Error::setup_with_source("Failed to build HTTP client", e))?;

        log::debug!("Connected remote client for core {core} at {url}");

        Ok(Self {
            inner: Arc::new(ClientInner {
                address: config.address.trim().trim_end_matches('/').to_string(),
                core: core.to_string(),
                http: RwLock::new(Some(http)),
            }),
        })
    }

    /// Base address of the service.
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Core (tenant) this handle is bound to.
    pub fn core(&self) -> &str {
        &self.inner.core
    }

    /// URL of an endpoint of the bound core.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.inner.address, self.inner.core, path)
    }

    /// Drop the HTTP client. Later requests fail with [`Error::Closed`].
    pub fn close(&self) {
        if self.inner.http.write().take().is_some() {
            log::debug!("Closed remote client for core {}", self.inner.core);
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.http.read().is_none()
    }

    fn http(&self) -> Result<Client> {
        self.inner
            .http
            .read()
            .clone()
            .ok_or_else(|| Error::closed(format!("remote client for core {}", self.inner.core)))
    }

    /// `GET` an endpoint and decode its JSON answer.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http()?
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::search_with_source(format!("GET {path} failed"), e))?;
        decode(path, response).await
    }

    /// `POST` a JSON body to an endpoint and decode its JSON answer.
    pub async fn post_json<B, T>(&self, path: &str, query: &[(&str, String)], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http()?
            .post(self.endpoint(path))
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::search_with_source(format!("POST {path} failed"), e))?;
        decode(path, response).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(Error::Remote {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| Error::search_with_source(format!("Invalid response from {path}"), e))
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("address", &self.inner.address)
            .field("core", &self.inner.core)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
