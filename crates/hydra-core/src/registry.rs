//! Immutable per-network endpoint registry and chain metadata lookups.
//!
//! The registry is an explicitly constructed, immutable configuration
//! value: there are no module-global tables and nothing is ever deleted
//! from a live registry. Narrowing to a single network is done by
//! constructing a smaller registry with [`ChainRegistry::for_network`]
//! rather than by pruning shared state.

use crate::types::{NetworkMeta, RpcEndpoint, Tracking};
use std::collections::HashMap;

/// Endpoints and metadata registered for one network.
#[derive(Debug, Clone, Default)]
pub struct NetworkEntry {
    pub endpoints: Vec<RpcEndpoint>,
    pub meta: Option<NetworkMeta>,
}

/// Read-only mapping from network id to registered endpoints and chain
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    networks: HashMap<String, NetworkEntry>,
}

impl ChainRegistry {
    /// Creates a registry from a prepared network table.
    #[must_use]
    pub fn new(networks: HashMap<String, NetworkEntry>) -> Self {
        Self { networks }
    }

    /// Returns an empty registry; useful when every endpoint is injected
    /// by the caller.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Constructs a narrowed registry containing only the given network.
    ///
    /// An unknown id yields a registry with no entries; resolution against
    /// it behaves as if the network had no registered endpoints.
    #[must_use]
    pub fn for_network(&self, network_id: &str) -> Self {
        let networks = self
            .networks
            .get_key_value(network_id)
            .map(|(id, entry)| HashMap::from([(id.clone(), entry.clone())]))
            .unwrap_or_default();
        Self { networks }
    }

    /// Returns the registered endpoints for a network, empty when unknown.
    #[must_use]
    pub fn endpoints(&self, network_id: &str) -> &[RpcEndpoint] {
        self.networks.get(network_id).map_or(&[], |entry| entry.endpoints.as_slice())
    }

    /// Returns the chain metadata descriptor for a network, if registered.
    #[must_use]
    pub fn meta(&self, network_id: &str) -> Option<&NetworkMeta> {
        self.networks.get(network_id).and_then(|entry| entry.meta.as_ref())
    }

    /// Returns the human-readable network name, if registered.
    #[must_use]
    pub fn network_name(&self, network_id: &str) -> Option<&str> {
        self.meta(network_id).map(|meta| meta.name.as_str())
    }

    /// Returns the ids of all registered networks.
    #[must_use]
    pub fn network_ids(&self) -> Vec<&str> {
        self.networks.keys().map(String::as_str).collect()
    }

    /// Resolves the candidate endpoint set for a network.
    ///
    /// Registered endpoints come first, caller-injected endpoints are
    /// appended, and the combined list is filtered by the tracking policy.
    /// Duplicate urls are kept: they are harmless (probed twice at worst)
    /// and deduplication is not part of the contract.
    ///
    /// The returned list may be empty; consumers fail with
    /// [`PoolError::EmptyPool`](crate::PoolError::EmptyPool) when they
    /// actually need an endpoint, not at resolution time.
    #[must_use]
    pub fn resolve(
        &self,
        network_id: &str,
        tracking: Tracking,
        injected: &[RpcEndpoint],
    ) -> Vec<RpcEndpoint> {
        let mut merged: Vec<RpcEndpoint> = self.endpoints(network_id).to_vec();
        merged.extend_from_slice(injected);
        filter_endpoints(merged, tracking)
    }
}

/// Filters endpoints by the caller's tracking acceptance policy.
///
/// - `yes`: keep every endpoint,
/// - `limited`: keep endpoints tagged `limited` or `none`,
/// - `none`: keep only endpoints tagged `none`.
#[must_use]
pub fn filter_endpoints(endpoints: Vec<RpcEndpoint>, tracking: Tracking) -> Vec<RpcEndpoint> {
    endpoints
        .into_iter()
        .filter(|endpoint| match tracking {
            Tracking::Yes => true,
            Tracking::Limited => {
                matches!(endpoint.tracking, Tracking::Limited | Tracking::None)
            }
            Tracking::None => endpoint.tracking == Tracking::None,
        })
        .collect()
}
