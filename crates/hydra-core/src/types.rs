//! Core type definitions for JSON-RPC, endpoints, and chain metadata.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: protocol conformance
//!
//! ## Endpoint Types
//! - [`RpcEndpoint`], [`Tracking`]: pool candidates and the privacy policy
//!   used to filter them
//! - [`LatencyMap`]: url → round-trip duration in milliseconds, rebuilt
//!   wholesale on every probe cycle
//!
//! ## Chain Metadata Types
//! - [`NetworkMeta`], [`NativeCurrency`], [`BlockExplorer`]: read-only
//!   descriptors carried by the registry

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashMap};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Mapping from endpoint url to measured round-trip latency in milliseconds.
///
/// Rebuilt wholesale on each probe cycle and shared as an immutable
/// snapshot; callers never mutate an existing map in place.
pub type LatencyMap = HashMap<String, f64>;

/// How much user data an RPC provider is known to collect.
///
/// Used both as a per-endpoint tag and as the caller's acceptance policy
/// when resolving the endpoint set for a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tracking {
    /// Provider may track anything; admitted only under a `yes` policy.
    Yes,
    /// Provider collects limited data.
    Limited,
    /// Provider collects no data.
    #[default]
    None,
}

/// One JSON-RPC network node identified by url.
///
/// Immutable once constructed; owned by the registry-resolved endpoint set
/// and referenced (never mutated) by every other component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub url: String,
    #[serde(default)]
    pub tracking: Tracking,
}

impl RpcEndpoint {
    /// Creates an endpoint with an explicit tracking tag.
    #[must_use]
    pub fn new(url: impl Into<String>, tracking: Tracking) -> Self {
        Self { url: url.into(), tracking }
    }

    /// Creates an endpoint tagged as collecting no data.
    ///
    /// Convenience for injected local nodes (anvil, hardhat) which are the
    /// common case for caller-supplied endpoints.
    #[must_use]
    pub fn untracked(url: impl Into<String>) -> Self {
        Self { url: url.into(), tracking: Tracking::None }
    }
}

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    /// Creates a new request with the protocol version preset.
    #[must_use]
    pub fn new(method: &str, params: Option<serde_json::Value>, id: u64) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.to_string(), params, id }
    }
}

/// A JSON-RPC response; exactly one of `result` / `error` is populated by
/// conforming servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: serde_json::Value,
}

/// Error object embedded in a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Native currency descriptor for a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Block explorer descriptor for a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockExplorer {
    pub name: String,
    pub url: String,
}

/// Read-only chain metadata for one network.
///
/// Supplied to the pool as part of the registry; the pool never mutates or
/// reloads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMeta {
    pub name: String,
    pub currency: NativeCurrency,
    #[serde(default)]
    pub explorers: Vec<BlockExplorer>,
    #[serde(default)]
    pub faucets: Vec<String>,
}
