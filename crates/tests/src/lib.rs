//! Integration tests for the Hydra RPC pool.
//!
//! This crate contains the test modules that exercise the pool against
//! real HTTP servers (mockito) rather than scripted transports:
//!
//! - `selection_tests`: probing, out-of-sync filtering, and both
//!   selection strategies over live mock servers
//! - `dispatcher_tests`: racing/failover behavior of dispatched calls
//! - `consensus_tests`: quorum and BFT consensus, including cooldown
//!   behavior for rate-limited endpoints
//! - `pool_tests`: end-to-end handler lifecycle (init, refresh, call,
//!   latency persistence)
//! - `mock_infrastructure`: reusable mockito builders for JSON-RPC
//!   endpoints
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```

#[cfg(test)]
mod mock_infrastructure;


#[cfg(test)]
mod dispatcher_tests;

#[cfg(test)]
mod consensus_tests;
