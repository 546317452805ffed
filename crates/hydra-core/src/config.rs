//! Pool configuration.
//!
//! Plain serde-derivable structs with compiled defaults. There is no
//! process-global configuration: a [`PoolConfig`] is constructed by the
//! embedder and moved into the pool, and the chain registry is passed
//! alongside it as an explicit immutable value.

use crate::{strategy::Strategy, types::RpcEndpoint, Tracking};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behavior for the racing dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of full sweeps through the latency-ordered batch list before
    /// a call fails permanently. Defaults to `3`.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Delay between sweeps in milliseconds. Defaults to `100`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { retry_count: default_retry_count(), retry_delay_ms: default_retry_delay_ms() }
    }
}

/// Configuration for one [`RpcPool`](crate::RpcPool).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Network id whose endpoints the pool manages (e.g. `"1"` for
    /// Ethereum mainnet, `"100"` for Gnosis).
    pub network_id: String,

    /// Privacy policy applied when resolving the endpoint set.
    /// Defaults to [`Tracking::None`] (strictest: fewest endpoints).
    #[serde(default)]
    pub tracking: Tracking,

    /// Caller-injected endpoints appended after the registry entries
    /// (local nodes, private gateways).
    #[serde(default)]
    pub injected_endpoints: Vec<RpcEndpoint>,

    /// Endpoint selection strategy. Defaults to [`Strategy::Fastest`].
    #[serde(default)]
    pub strategy: Strategy,

    /// Racing dispatcher retry behavior.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Timeout for probe requests during latency measurement, in
    /// milliseconds. Defaults to `3000`.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Hard timeout for individual dispatched RPC calls, in milliseconds.
    /// Defaults to `10000`.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Whether the first-healthy strategy may also consider plain-`http`
    /// loopback endpoints (local anvil/hardhat nodes). Defaults to `false`:
    /// only `https` endpoints are probed.
    #[serde(default)]
    pub allow_insecure_loopback: bool,
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

impl PoolConfig {
    /// Creates a configuration for a network with all defaults.
    #[must_use]
    pub fn new(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            tracking: Tracking::default(),
            injected_endpoints: Vec::new(),
            strategy: Strategy::default(),
            retry: RetryConfig::default(),
            probe_timeout_ms: default_probe_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            allow_insecure_loopback: false,
        }
    }

    /// Probe timeout as a [`Duration`].
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Per-call timeout as a [`Duration`].
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Retry delay as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry.retry_delay_ms)
    }
}
