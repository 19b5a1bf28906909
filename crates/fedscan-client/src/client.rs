//! HTTP client for one storage node (reqwest-based).
//!
//! Coordinating and member nodes expose the same read-only collection API,
//! so a single [`NodeClient`] serves both roles. Registry and search-index
//! calls only succeed against a coordinator.

use crate::error::{ClientError, ClientResult};
use crate::types::{IndexCount, NodeRecord, ObjectPage, SystemMetadata};
use bytes::Bytes;
use futures_util::Stream;
use reqwest::{Client, Identity, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for a [`NodeClient`].
///
/// Carries everything needed to reach a node: per-request timeout, TLS
/// verification toggle, and an optional PEM client identity (certificate +
/// private key concatenated) for authenticated access.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    timeout: Option<Duration>,
    tls_verify: bool,
    identity_pem: Option<Vec<u8>>,
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: None,
            tls_verify: true,
            identity_pem: None,
        }
    }

    /// Per-request timeout, distinct from any retry policy.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable TLS certificate verification (test environments only).
    #[must_use]
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// PEM-encoded client certificate plus private key.
    #[must_use]
    pub fn with_identity_pem(mut self, pem: Vec<u8>) -> Self {
        self.identity_pem = Some(pem);
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    fn build_http_client(&self) -> ClientResult<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout())
            .danger_accept_invalid_certs(!self.tls_verify)
            .user_agent(concat!("fedscan/", env!("CARGO_PKG_VERSION")));

        if let Some(pem) = &self.identity_pem {
            let identity = Identity::from_pem(pem).map_err(|e| {
                ClientError::InvalidConfig(format!("failed to load client identity: {e}"))
            })?;
            builder = builder.identity(identity);
        }

        builder
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("failed to build HTTP client: {e}")))
    }
}

/// Client for one node's collection API.
#[derive(Debug, Clone)]
pub struct NodeClient {
    /// Base URL of the node (e.g. "<https://cn.example.org>").
    base_url: String,
    http_client: Client,
    timeout_secs: u64,
}

impl NodeClient {
    /// Create a client for the node at `base_url`.
    pub fn new(base_url: impl Into<String>, config: &ClientConfig) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::InvalidConfig("empty base URL".into()));
        }
        Ok(Self {
            base_url,
            http_client: config.build_http_client()?,
            timeout_secs: config.timeout().as_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: impl Into<String>, http_client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Object listing ────────────────────────────────────────────────

    /// Fetch one page of the node's object listing.
    ///
    /// `node_filter` scopes a coordinator's listing to records held by one
    /// member node; member nodes ignore it.
    pub async fn list_objects(
        &self,
        start: u64,
        count: u64,
        node_filter: Option<&str>,
    ) -> ClientResult<ObjectPage> {
        let url = format!("{}/v2/object", self.base_url);
        debug!(url = %url, start, count, filter = ?node_filter, "GET object listing");

        let mut query: Vec<(&str, String)> =
            vec![("start", start.to_string()), ("count", count.to_string())];
        if let Some(node_id) = node_filter {
            query.push(("nodeId", node_id.to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&url, e))?;
        self.handle_response(&url, response).await
    }

    /// Total record count as of now: a `count=0` probe page.
    pub async fn count_objects(&self, node_filter: Option<&str>) -> ClientResult<u64> {
        let page = self.list_objects(0, 0, node_filter).await?;
        Ok(page.total)
    }

    // ── Object metadata and content ───────────────────────────────────

    /// Retrieve the node's metadata record for one identifier.
    pub async fn get_system_metadata(&self, pid: &str) -> ClientResult<SystemMetadata> {
        let url = format!("{}/v2/meta/{}", self.base_url, pid);
        debug!(url = %url, "GET system metadata");
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::not_found(&self.base_url, format!("pid {pid}")));
        }
        self.handle_response(&url, response).await
    }

    /// Stream one object's bytes, consumable incrementally so the content is
    /// never buffered whole in memory.
    pub async fn stream_object(
        &self,
        pid: &str,
    ) -> ClientResult<impl Stream<Item = Result<Bytes, reqwest::Error>>> {
        let url = format!("{}/v2/object/{}", self.base_url, pid);
        debug!(url = %url, "GET object content");
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::not_found(&self.base_url, format!("pid {pid}")));
        }
        if !status.is_success() {
            return Err(self.status_error(&url, response).await);
        }
        Ok(response.bytes_stream())
    }

    // ── Coordinator-only endpoints ────────────────────────────────────

    /// List the federation's node registry.
    pub async fn list_nodes(&self) -> ClientResult<Vec<NodeRecord>> {
        let url = format!("{}/v2/node", self.base_url);
        debug!(url = %url, "GET node registry");
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&url, e))?;
        self.handle_response(&url, response).await
    }

    /// Secondary search-index record count scoped to one node identifier.
    ///
    /// An independent source of truth from the object listing; callers must
    /// report it alongside, never fold it into, inventory totals.
    pub async fn index_count(&self, node_id: &str) -> ClientResult<u64> {
        let url = format!("{}/v2/index/count", self.base_url);
        debug!(url = %url, node_id, "GET index count");
        let response = self
            .http_client
            .get(&url)
            .query(&[("nodeId", node_id)])
            .send()
            .await
            .map_err(|e| self.map_transport_error(&url, e))?;
        let count: IndexCount = self.handle_response(&url, response).await?;
        Ok(count.count)
    }

    // ── Response handling ─────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(url, response).await);
        }
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;
        serde_json::from_str(&body).map_err(|e| ClientError::parse(url, e.to_string()))
    }

    async fn status_error(&self, url: &str, response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let detail = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body
        };
        ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
            detail,
        }
    }

    fn map_transport_error(&self, url: &str, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            ClientError::Http(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_stripped() {
        let client =
            NodeClient::new("https://cn.example.org/", &ClientConfig::new()).unwrap();
        assert_eq!(client.base_url(), "https://cn.example.org");
    }

    #[test]
    fn empty_base_url_rejected() {
        let result = NodeClient::new("", &ClientConfig::new());
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn bad_identity_pem_rejected() {
        let config = ClientConfig::new().with_identity_pem(b"not a pem".to_vec());
        let result = NodeClient::new("https://cn.example.org", &config);
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }
}
