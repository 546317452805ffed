//! Error taxonomy for the RPC pool.
//!
//! Transient per-endpoint failures (timeouts, connection errors, rate
//! limits, server errors) are never fatal by themselves: they are logged
//! and, where applicable, drive cooldown bookkeeping. Only exhaustion of
//! all alternatives escalates into one of the fatal variants, each of
//! which carries enough context to diagnose the failure without a re-run
//! under debug logging.

use thiserror::Error;

/// Errors surfaced by the RPC pool and its components.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PoolError {
    /// No endpoints available for the requested policy/network.
    #[error("no endpoints available for network {network} under the configured tracking policy")]
    EmptyPool { network: String },

    /// The selection strategy probed every candidate and found nothing usable.
    #[error("no healthy endpoint found among {probed} candidates")]
    SelectionFailed { probed: usize },

    /// A call was issued before `init()` established an active endpoint.
    #[error("pool not initialized")]
    NotInitialized,

    /// Consensus attempted with fewer than two eligible endpoints.
    #[error("only one endpoint eligible, consensus is undefined")]
    SingleEndpoint,

    /// The racing dispatcher exhausted every batch across every sweep.
    #[error("all endpoint batches exhausted for {method} after {sweeps} sweeps: {source}")]
    BatchExhausted {
        method: String,
        sweeps: u32,
        #[source]
        source: Box<PoolError>,
    },

    /// Quorum was not met at the configured threshold.
    #[error(
        "could not reach consensus: most common result {most_common} seen {count} of {collected} times, needed {needed}"
    )]
    ConsensusNotReached { most_common: String, count: usize, collected: usize, needed: usize },

    /// Quorum was not met even after descending to the minimum threshold.
    #[error(
        "could not reach consensus down to minimum threshold {min_ratio} ({collected} responses collected)"
    )]
    BftConsensusNotReached { min_ratio: f64, collected: usize },

    /// Request exceeded its timeout.
    #[error("request timeout")]
    Timeout,

    /// HTTP-level error (non-2xx status code).
    #[error("HTTP {0}: {1}")]
    HttpStatus(u16, String),

    /// JSON-RPC error returned by the endpoint.
    #[error("RPC error {0}: {1}")]
    Rpc(i64, String),

    /// Failed to reach the endpoint at the network level.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Response could not be parsed or was structurally malformed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request could not be serialized.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PoolError {
    /// Returns `true` for rate-limit signatures (HTTP 429 or the JSON-RPC
    /// limit-exceeded code).
    ///
    /// Rate limits drive the steeper cooldown factor in the consensus
    /// engine.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::HttpStatus(status, _) => *status == 429,
            Self::Rpc(code, _) => *code == -32005,
            _ => false,
        }
    }

    /// Returns `true` for HTTP 5xx server errors.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::HttpStatus(status, _) if (500..=599).contains(status))
    }

    /// Returns `true` if this error is transient and another endpoint (or a
    /// later retry) may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::HttpStatus(status, _) => (500..=599).contains(status) || *status == 429,
            Self::Rpc(code, _) => *code == -32005,
            _ => false,
        }
    }
}
