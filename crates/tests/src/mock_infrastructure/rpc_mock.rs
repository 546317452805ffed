//! Mockito-backed JSON-RPC endpoint builder.
//!
//! Wraps mockito with builders for the request shapes the pool issues:
//! probe requests (`eth_getBlockByNumber` + `eth_getCode`), ordinary
//! method calls, and failure modes (HTTP status errors, JSON-RPC error
//! objects).

use hydra_core::probe::PERMIT2_BYTECODE_PREFIX;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// One mock JSON-RPC endpoint.
pub struct RpcMock {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl RpcMock {
    /// Starts a fresh mock server.
    pub async fn start() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// The endpoint url of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Serves a healthy probe pair: a head block at `block_number` and a
    /// valid Permit2 bytecode prefix.
    pub async fn mock_healthy_probe(&mut self, block_number: &str) -> &mut Self {
        let bytecode = format!("{PERMIT2_BYTECODE_PREFIX}a0b1c2");
        self.mock_method("eth_getBlockByNumber", &json!({ "number": block_number })).await;
        self.mock_method("eth_getCode", &json!(bytecode)).await;
        self
    }

    /// Serves a probe pair whose bytecode does not match the expected
    /// contract, so the endpoint fails validation despite responding.
    pub async fn mock_bogus_bytecode_probe(&mut self, block_number: &str) -> &mut Self {
        self.mock_method("eth_getBlockByNumber", &json!({ "number": block_number })).await;
        self.mock_method("eth_getCode", &json!("0xdeadbeef")).await;
        self
    }

    /// Serves `result` for every request naming `method`.
    pub async fn mock_method(&mut self, method: &str, result: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Serves `result` for `method` and records an expected hit count,
    /// checked by [`assert_all`](Self::assert_all).
    pub async fn mock_method_expect(
        &mut self,
        method: &str,
        result: &Value,
        hits: usize,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .expect(hits)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Answers every request naming `method` with an HTTP status error.
    pub async fn mock_method_status(&mut self, method: &str, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(status)
            .with_body("upstream unavailable")
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Answers every request with an HTTP status error.
    pub async fn mock_all_status(&mut self, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .with_body("upstream unavailable")
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Answers every request naming `method` with a JSON-RPC error object.
    pub async fn mock_method_rpc_error(
        &mut self,
        method: &str,
        code: i64,
        message: &str,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
                    .to_string(),
            )
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Verifies every expectation registered with
    /// [`mock_method_expect`](Self::mock_method_expect).
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
