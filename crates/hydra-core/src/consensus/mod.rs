//! Quorum-based consensus across many endpoints.
//!
//! The engine fires a single JSON-RPC request at many endpoints with
//! bounded concurrency, normalizes and counts the responses, and decides
//! whether a quorum was reached. A shared cooldown table progressively
//! excludes endpoints that answer with rate limits or server errors.
//!
//! The BFT variant collects once and then descends the required ratio in
//! fixed steps against the already-known tally, so a looser threshold is
//! never paid for with another round of requests.

pub mod cooldown;
pub mod engine;
pub mod normalize;

pub use cooldown::{CooldownEntry, CooldownTable};
pub use engine::{ConsensusEngine, ConsensusOptions};
