//! # Hydra Core
//!
//! Core library for the Hydra multi-endpoint JSON-RPC pool.
//!
//! Hydra turns a list of unreliable public RPC endpoints into a single
//! logical provider. It continuously measures endpoint health and latency,
//! selects an active endpoint through a pluggable strategy, races every
//! outbound call across small batches of the best-known endpoints, and can
//! cross-validate critical reads through quorum consensus.
//!
//! This crate provides:
//!
//! - **[`registry`]**: Immutable per-network endpoint registry with
//!   tracking-privacy filtering and chain metadata lookups.
//!
//! - **[`probe`]**: Parallel dual-request health probing (chain head +
//!   known-contract bytecode) with out-of-sync endpoint detection.
//!
//! - **[`strategy`]**: Selection strategies turning a probe outcome into an
//!   active endpoint (`fastest` and `first-healthy`).
//!
//! - **[`dispatcher`]**: Racing call dispatch over latency-ordered batches
//!   with sweep-level retry.
//!
//! - **[`consensus`]**: Quorum and BFT-style consensus across many
//!   endpoints, with a shared cooldown table for rate-limited providers.
//!
//! - **[`pool`]**: The [`RpcPool`] handler tying everything together.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                         RpcPool                           │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────────┐   │
//! │  │ ChainRegistry│  │ HealthProbe │  │ ConsensusEngine │   │
//! │  └──────┬───────┘  └──────┬──────┘  └────────┬────────┘   │
//! │         │                 │                  │            │
//! │  resolve(network,   measure(endpoints)   cooldown table   │
//! │   tracking)               │                  │            │
//! │         ▼                 ▼                  ▼            │
//! │  ┌─────────────────────────────────────────────────┐      │
//! │  │       Strategy (fastest / first-healthy)        │      │
//! │  └───────────────────────┬─────────────────────────┘      │
//! │                          ▼                                │
//! │  ┌─────────────────────────────────────────────────┐      │
//! │  │   RacingDispatcher (batches of 3, N sweeps)     │      │
//! │  └─────────────────────────────────────────────────┘      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Call Flow
//!
//! ```text
//! init()  ──► resolve endpoints ──► strategy probes ──► Ready(active, latencies)
//! call()  ──► latency-ordered urls ──► race batch ──► first success wins
//! consensus() ──► eligible urls (no ws, no cooldown) ──► bounded fan-out
//!                 ──► normalize + count ──► quorum check
//! ```

pub mod config;
pub mod consensus;
pub mod dispatcher;
pub mod error;
pub mod pool;
pub mod probe;
pub mod registry;
pub mod store;
pub mod strategy;
pub mod transport;
pub mod types;

pub use config::{PoolConfig, RetryConfig};
pub use consensus::{ConsensusEngine, ConsensusOptions};
pub use dispatcher::RacingDispatcher;
pub use error::PoolError;
pub use pool::RpcPool;
pub use probe::{HealthProbe, ProbeOutcome, ProbeResult};
pub use registry::{ChainRegistry, NetworkEntry};
pub use store::{LatencyStore, MemoryStore};
pub use strategy::{Selection, Strategy};
pub use transport::{HttpTransport, Transport};
pub use types::{
    BlockExplorer, JsonRpcError, JsonRpcRequest, JsonRpcResponse, LatencyMap, NativeCurrency,
    NetworkMeta, RpcEndpoint, Tracking,
};
