//! JSON-RPC transport primitive.
//!
//! The pool consumes a single injected capability: send one JSON-RPC
//! request to one url with a timeout, get a response or an error. The
//! [`Transport`] trait is that seam; [`HttpTransport`] is the production
//! implementation backed by a pooled reqwest client.

use crate::{
    error::PoolError,
    types::{JsonRpcRequest, JsonRpcResponse},
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Maximum length of an HTTP error body carried into an error message.
const ERROR_BODY_LIMIT: usize = 256;

/// Sends a single JSON-RPC request and returns the parsed response.
///
/// Implementations must surface HTTP status information through
/// [`PoolError::HttpStatus`] so the consensus engine can recognize
/// rate-limit (429) and server-error (5xx) signatures, and must
/// distinguish timeouts from other failures.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `request` to `url`, failing if no response arrives within
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a transport-level [`PoolError`] variant on failure,
    /// including [`PoolError::Rpc`] when the endpoint answered with a
    /// JSON-RPC error object instead of a result.
    async fn post(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, PoolError>;
}

/// Production HTTP transport with connection pooling.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with pooled connections, rustls TLS, and no
    /// redirect following.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Connection`] if the underlying client fails to
    /// build.
    pub fn new() -> Result<Self, PoolError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("hydra/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http transport");
                PoolError::Connection(format!("http client build failed: {e}"))
            })?;
        Ok(Self { client })
    }

    /// Maps a reqwest failure into the pool error taxonomy without leaking
    /// connection details beyond a coarse category.
    fn classify_network_error(error: &reqwest::Error) -> PoolError {
        if error.is_timeout() {
            PoolError::Timeout
        } else if error.is_connect() {
            PoolError::Connection("connection refused or unreachable".to_string())
        } else {
            PoolError::Connection("network error".to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, PoolError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| PoolError::InvalidRequest(format!("failed to serialize request: {e}")))?;

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::classify_network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let text = if raw.len() > ERROR_BODY_LIMIT {
                format!("{}... (truncated)", &raw[..ERROR_BODY_LIMIT])
            } else {
                raw
            };
            return Err(PoolError::HttpStatus(status.as_u16(), text));
        }

        let bytes = response.bytes().await.map_err(|e| Self::classify_network_error(&e))?;
        let parsed: JsonRpcResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PoolError::InvalidResponse(format!("invalid JSON: {e}")))?;

        if let Some(error) = &parsed.error {
            return Err(PoolError::Rpc(error.code, error.message.clone()));
        }

        Ok(parsed)
    }
}
