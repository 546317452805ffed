//! The pool handler: one logical provider over many physical endpoints.
//!
//! [`RpcPool`] owns the resolved endpoint set and the last-known latency
//! snapshot, runs the configured selection strategy to obtain an active
//! endpoint, builds the racing dispatcher around it for ordinary calls,
//! and exposes the consensus engine for calls that need cross-validation
//! instead of single-endpoint speed.
//!
//! State machine: `Uninitialized → Ready(active, latencies)` through
//! [`init`](RpcPool::init); [`refresh`](RpcPool::refresh) re-runs the
//! strategy and either installs a fresh selection or keeps the previous
//! one with a logged warning — a pool never regresses from `Ready`.

use crate::{
    config::PoolConfig,
    consensus::{ConsensusEngine, ConsensusOptions},
    dispatcher::RacingDispatcher,
    error::PoolError,
    probe::HealthProbe,
    registry::ChainRegistry,
    store::LatencyStore,
    transport::{HttpTransport, Transport},
    types::{JsonRpcRequest, LatencyMap, RpcEndpoint},
};
use arc_swap::{ArcSwap, ArcSwapOption};
use std::sync::Arc;

/// One logical JSON-RPC provider backed by many physical endpoints.
pub struct RpcPool {
    config: PoolConfig,
    endpoints: Vec<RpcEndpoint>,
    transport: Arc<dyn Transport>,
    probe: HealthProbe,
    consensus: ConsensusEngine,
    active_url: ArcSwapOption<String>,
    latencies: ArcSwap<LatencyMap>,
    store: Option<Arc<dyn LatencyStore>>,
}

impl RpcPool {
    /// Creates a pool over the production HTTP transport.
    ///
    /// The endpoint set is resolved once, here: registry endpoints for the
    /// configured network first, injected endpoints appended, filtered by
    /// the tracking policy.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Connection`] if the HTTP client fails to
    /// build.
    pub fn new(config: PoolConfig, registry: &ChainRegistry) -> Result<Self, PoolError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(Self::with_transport(config, registry, transport))
    }

    /// Creates a pool over an injected transport.
    #[must_use]
    pub fn with_transport(
        config: PoolConfig,
        registry: &ChainRegistry,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let endpoints =
            registry.resolve(&config.network_id, config.tracking, &config.injected_endpoints);
        let probe = HealthProbe::new(Arc::clone(&transport));
        let consensus = ConsensusEngine::new(Arc::clone(&transport), config.network_id.clone());
        Self {
            config,
            endpoints,
            transport,
            probe,
            consensus,
            active_url: ArcSwapOption::empty(),
            latencies: ArcSwap::from_pointee(LatencyMap::new()),
            store: None,
        }
    }

    /// Attaches a latency store and immediately loads any cached snapshot
    /// for this network.
    ///
    /// The cache only warms endpoint ordering on cold start; a corrupt or
    /// missing entry is ignored.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn LatencyStore>) -> Self {
        if let Some(raw) = store.load(&self.store_key()) {
            match serde_json::from_str::<LatencyMap>(&raw) {
                Ok(cached) if !cached.is_empty() => {
                    tracing::debug!(
                        network = %self.config.network_id,
                        endpoints = cached.len(),
                        "loaded cached latency snapshot"
                    );
                    self.latencies.store(Arc::new(cached));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring unparseable latency cache");
                }
            }
        }
        self.store = Some(store);
        self
    }

    /// The resolved candidate endpoints for this pool.
    #[must_use]
    pub fn endpoints(&self) -> &[RpcEndpoint] {
        &self.endpoints
    }

    /// Runs the selection strategy and installs the chosen endpoint.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EmptyPool`] if the resolved endpoint set is empty,
    /// - [`PoolError::SelectionFailed`] if every candidate failed its
    ///   probe. No silent fallback happens in either case.
    pub async fn init(&self) -> Result<(), PoolError> {
        let selection = self.run_strategy().await?.ok_or(PoolError::SelectionFailed {
            probed: self.endpoints.len(),
        })?;
        tracing::info!(
            url = %selection.url,
            network = %self.config.network_id,
            "initialized active endpoint"
        );
        self.install(selection);
        Ok(())
    }

    /// Re-runs the selection strategy.
    ///
    /// On success the active endpoint and latency snapshot are replaced.
    /// If the re-run finds nothing usable the previous selection is kept
    /// and a warning is logged; an initialized pool never regresses to
    /// uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::EmptyPool`] if the resolved endpoint set is
    /// empty.
    pub async fn refresh(&self) -> Result<(), PoolError> {
        match self.run_strategy().await? {
            Some(selection) => {
                tracing::info!(url = %selection.url, "refreshed active endpoint");
                self.install(selection);
            }
            None => {
                tracing::warn!(
                    network = %self.config.network_id,
                    "refresh found no healthy endpoint, keeping previous selection"
                );
            }
        }
        Ok(())
    }

    /// Returns the active endpoint url.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotInitialized`] before a successful
    /// [`init`](Self::init).
    pub fn active_endpoint(&self) -> Result<String, PoolError> {
        self.active_url.load_full().map(|url| (*url).clone()).ok_or(PoolError::NotInitialized)
    }

    /// Returns the current latency snapshot.
    ///
    /// Between probe cycles repeated calls observe the identical snapshot;
    /// the map is only ever replaced wholesale, never mutated in place.
    #[must_use]
    pub fn latencies(&self) -> LatencyMap {
        (**self.latencies.load()).clone()
    }

    /// Dispatches one JSON-RPC call through the racing/retry layer and
    /// returns its `result` payload.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NotInitialized`] before [`init`](Self::init),
    /// - [`PoolError::BatchExhausted`] when every batch of every sweep
    ///   failed.
    pub async fn call(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PoolError> {
        self.dispatcher()?.invoke(method, params).await
    }

    /// Requires a quorum of structurally identical responses across the
    /// pool. See [`ConsensusEngine::consensus`].
    ///
    /// # Errors
    ///
    /// Propagates the consensus engine's error taxonomy.
    pub async fn consensus(
        &self,
        request: &JsonRpcRequest,
        quorum_ratio: f64,
        options: &ConsensusOptions,
    ) -> Result<serde_json::Value, PoolError> {
        self.consensus.consensus(&self.endpoints, request, quorum_ratio, options).await
    }

    /// BFT-style consensus with a descending threshold. See
    /// [`ConsensusEngine::bft_consensus`].
    ///
    /// # Errors
    ///
    /// Propagates the consensus engine's error taxonomy.
    pub async fn bft_consensus(
        &self,
        request: &JsonRpcRequest,
        start_ratio: f64,
        min_ratio: f64,
        options: &ConsensusOptions,
    ) -> Result<serde_json::Value, PoolError> {
        self.consensus
            .bft_consensus(&self.endpoints, request, start_ratio, min_ratio, options)
            .await
    }

    /// The consensus engine, exposed for cooldown observability.
    #[must_use]
    pub fn consensus_engine(&self) -> &ConsensusEngine {
        &self.consensus
    }

    /// Builds the racing dispatcher around the current selection.
    fn dispatcher(&self) -> Result<RacingDispatcher, PoolError> {
        let active = self.active_endpoint()?;
        let ordered = RacingDispatcher::order_by_latency(&self.latencies.load());
        Ok(RacingDispatcher::new(
            Arc::clone(&self.transport),
            active,
            ordered,
            self.config.retry.retry_count,
            self.config.retry_delay(),
            self.config.call_timeout(),
        ))
    }

    async fn run_strategy(&self) -> Result<Option<crate::strategy::Selection>, PoolError> {
        if self.endpoints.is_empty() {
            return Err(PoolError::EmptyPool { network: self.config.network_id.clone() });
        }
        Ok(self
            .config
            .strategy
            .select(
                &self.probe,
                &self.endpoints,
                self.config.probe_timeout(),
                self.config.allow_insecure_loopback,
            )
            .await)
    }

    /// Installs a fresh selection: snapshot swap plus cache write-back.
    fn install(&self, selection: crate::strategy::Selection) {
        self.latencies.store(Arc::new(selection.latencies));
        self.active_url.store(Some(Arc::new(selection.url)));
        self.persist();
    }

    fn store_key(&self) -> String {
        format!("rpc-latencies-{}", self.config.network_id)
    }

    fn persist(&self) {
        let Some(store) = &self.store else { return };
        match serde_json::to_string(&**self.latencies.load()) {
            Ok(raw) => store.save(&self.store_key(), &raw),
            Err(e) => tracing::debug!(error = %e, "failed to serialize latency snapshot"),
        }
    }
}
