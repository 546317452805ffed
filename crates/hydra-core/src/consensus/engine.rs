//! Consensus engine implementation.
//!
//! One collection mechanism backs two operations: plain quorum consensus
//! (with optional early abort once a value already satisfies the dynamic
//! quorum) and BFT-style consensus, which collects once and then descends
//! the required ratio against the recorded tally without issuing new
//! requests.

use super::{cooldown::CooldownTable, normalize::canonical_key};
use crate::{
    error::PoolError,
    transport::Transport,
    types::{JsonRpcRequest, RpcEndpoint},
};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    sync::Arc,
    time::Duration,
};
use tokio::time::Instant;

/// Step by which the BFT variant lowers the required ratio, in percent.
const BFT_DESCENT_STEP_PCT: i64 = 5;

/// Per-call knobs for a consensus query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusOptions {
    /// Per-request timeout in milliseconds. Defaults to `8000`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum in-flight requests. Defaults to `4`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Base cooldown applied on the first rate-limit/server-error strike,
    /// in milliseconds. Defaults to `30000`.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_concurrency() -> usize {
    4
}

fn default_cooldown_ms() -> u64 {
    30_000
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            concurrency: default_concurrency(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl ConsensusOptions {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn cooldown_base(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Tally built by one collection pass, reused by the BFT descent.
struct ConsensusAttempt {
    /// Whether the best value met the quorum at the requested ratio.
    success: bool,
    /// Original (non-normalized) value of the best key, when any response
    /// was collected.
    value: Option<serde_json::Value>,
    best_key: Option<String>,
    best_count: usize,
    collected: usize,
    needed: usize,
}

/// Mutable tally shared by the bounded worker pool during collection.
#[derive(Default)]
struct AttemptState {
    counts: HashMap<String, usize>,
    raw: HashMap<String, serde_json::Value>,
    /// Keys in first-collected order; the explicit tie-break for "most
    /// common result".
    order: Vec<String>,
    collected: usize,
    /// Once set, no further requests are launched. Requests already in
    /// flight settle normally and their results still count toward the
    /// final quorum.
    aborted: bool,
}

/// Fires one request at many endpoints and decides whether they agree.
pub struct ConsensusEngine {
    transport: Arc<dyn Transport>,
    network: String,
    cooldowns: Mutex<CooldownTable>,
}

impl ConsensusEngine {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, network: impl Into<String>) -> Self {
        Self { transport, network: network.into(), cooldowns: Mutex::new(CooldownTable::new()) }
    }

    /// Requires a quorum of structurally identical responses across the
    /// pool.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EmptyPool`] with zero eligible endpoints,
    /// - [`PoolError::SingleEndpoint`] with exactly one (consensus is
    ///   undefined with fewer than two voters),
    /// - [`PoolError::ConsensusNotReached`] when the best value falls
    ///   short of `ceil(collected × quorum_ratio)`.
    pub async fn consensus(
        &self,
        endpoints: &[RpcEndpoint],
        request: &JsonRpcRequest,
        quorum_ratio: f64,
        options: &ConsensusOptions,
    ) -> Result<serde_json::Value, PoolError> {
        let attempt = self.attempt(endpoints, request, quorum_ratio, options, true).await?;
        if attempt.success {
            if let Some(value) = attempt.value {
                return Ok(value);
            }
        }
        Err(PoolError::ConsensusNotReached {
            most_common: attempt.best_key.unwrap_or_else(|| "n/a".to_string()),
            count: attempt.best_count,
            collected: attempt.collected,
            needed: attempt.needed,
        })
    }

    /// BFT-style consensus: one collection pass with early abort disabled,
    /// then the required ratio is lowered in fixed decrements down to
    /// `min_ratio`, re-evaluating the already-known tally at each step.
    ///
    /// Useful for heterogeneous pools returning occasional mismatched
    /// data; descending against the recorded tally avoids re-querying
    /// endpoints merely to test a looser threshold, which keeps rate-limit
    /// exposure down.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EmptyPool`] / [`PoolError::SingleEndpoint`] as for
    ///   [`consensus`](Self::consensus),
    /// - [`PoolError::BftConsensusNotReached`] when the descent reaches
    ///   `min_ratio` without a satisfied quorum (including the
    ///   zero-successful-responses case).
    pub async fn bft_consensus(
        &self,
        endpoints: &[RpcEndpoint],
        request: &JsonRpcRequest,
        start_ratio: f64,
        min_ratio: f64,
        options: &ConsensusOptions,
    ) -> Result<serde_json::Value, PoolError> {
        let attempt = self.attempt(endpoints, request, start_ratio, options, false).await?;
        if attempt.success {
            if let Some(value) = attempt.value {
                return Ok(value);
            }
        }
        if attempt.collected == 0 {
            return Err(PoolError::BftConsensusNotReached { min_ratio, collected: 0 });
        }

        // Descend in integer percent steps to keep the loop free of
        // floating-point drift.
        #[allow(clippy::cast_possible_truncation)]
        let mut current_pct = (start_ratio * 100.0).round() as i64 - BFT_DESCENT_STEP_PCT;
        #[allow(clippy::cast_possible_truncation)]
        let min_pct = (min_ratio * 100.0).round() as i64;

        while current_pct >= min_pct {
            #[allow(clippy::cast_precision_loss)]
            let ratio = current_pct as f64 / 100.0;
            let needed = quorum_needed(attempt.collected, ratio);
            if needed == 0 {
                break;
            }
            if attempt.best_count >= needed {
                tracing::debug!(
                    ratio = ratio,
                    agreed = attempt.best_count,
                    collected = attempt.collected,
                    "descended threshold satisfied"
                );
                if let Some(value) = attempt.value {
                    return Ok(value);
                }
            }
            current_pct -= BFT_DESCENT_STEP_PCT;
        }

        Err(PoolError::BftConsensusNotReached { min_ratio, collected: attempt.collected })
    }

    /// Current strike count for an endpoint; observability hook for
    /// embedders and tests.
    #[must_use]
    pub fn cooldown_strikes(&self, url: &str) -> u32 {
        self.cooldowns.lock().strikes(url)
    }

    /// One collection pass: gather eligible urls, fan out with bounded
    /// concurrency, normalize and tally responses.
    async fn attempt(
        &self,
        endpoints: &[RpcEndpoint],
        request: &JsonRpcRequest,
        quorum_ratio: f64,
        options: &ConsensusOptions,
        allow_early_abort: bool,
    ) -> Result<ConsensusAttempt, PoolError> {
        let now = Instant::now();
        let mut urls: Vec<&str> = {
            let cooldowns = self.cooldowns.lock();
            endpoints
                .iter()
                .map(|endpoint| endpoint.url.as_str())
                .filter(|url| !is_websocket_url(url))
                .filter(|url| !cooldowns.is_cooling(url, now))
                .collect()
        };

        if urls.is_empty() {
            return Err(PoolError::EmptyPool { network: self.network.clone() });
        }
        if urls.len() == 1 {
            return Err(PoolError::SingleEndpoint);
        }

        // Avoid hammering the same endpoint first across repeated calls.
        urls.shuffle(&mut rand::rng());

        tracing::debug!(
            method = %request.method,
            eligible = urls.len(),
            concurrency = options.concurrency,
            early_abort = allow_early_abort,
            "starting consensus collection"
        );

        let state = Mutex::new(AttemptState::default());
        let next_index = AtomicUsize::new(0);
        let worker_count = options.concurrency.max(1).min(urls.len());

        let workers = (0..worker_count).map(|_| {
            self.run_worker(
                &urls,
                request,
                quorum_ratio,
                options,
                allow_early_abort,
                &state,
                &next_index,
            )
        });
        futures_util::future::join_all(workers).await;

        let state = state.into_inner();
        let needed = quorum_needed(state.collected, quorum_ratio);

        let mut best: Option<(&String, usize)> = None;
        for key in &state.order {
            let count = state.counts.get(key).copied().unwrap_or(0);
            match best {
                // Strictly greater keeps the first-collected key on ties.
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((key, count)),
            }
        }

        let (best_key, best_count) = match best {
            Some((key, count)) => (Some(key.clone()), count),
            None => (None, 0),
        };
        let value = best_key.as_ref().and_then(|key| state.raw.get(key).cloned());
        let success = best_count > 0 && best_count >= needed;

        Ok(ConsensusAttempt { success, value, best_key, best_count, collected: state.collected, needed })
    }

    /// Worker loop: drain the url queue until it is empty or an early
    /// abort fires. The abort gate sits in front of the launch, so a
    /// request already in flight settles and counts.
    #[allow(clippy::too_many_arguments)]
    async fn run_worker(
        &self,
        urls: &[&str],
        request: &JsonRpcRequest,
        quorum_ratio: f64,
        options: &ConsensusOptions,
        allow_early_abort: bool,
        state: &Mutex<AttemptState>,
        next_index: &AtomicUsize,
    ) {
        loop {
            if state.lock().aborted {
                return;
            }
            let index = next_index.fetch_add(1, Ordering::SeqCst);
            let Some(url) = urls.get(index) else { return };

            match self.transport.post(url, request, options.timeout()).await {
                Ok(response) => {
                    let Some(result) = response.result else { continue };
                    let (key, _serialized) = canonical_key(&result);
                    let mut tally = state.lock();
                    tally.collected += 1;
                    let count = {
                        let entry = tally.counts.entry(key.clone()).or_insert(0);
                        *entry += 1;
                        *entry
                    };
                    if !tally.raw.contains_key(&key) {
                        tally.order.push(key.clone());
                        tally.raw.insert(key, result);
                    }
                    if allow_early_abort
                        && !tally.aborted
                        && count >= quorum_needed(tally.collected, quorum_ratio)
                    {
                        tracing::debug!(
                            method = %request.method,
                            agreed = count,
                            collected = tally.collected,
                            "quorum already satisfied, not launching further requests"
                        );
                        tally.aborted = true;
                    }
                }
                Err(error) => {
                    if error.is_rate_limit() || error.is_server_error() {
                        let (strikes, delay) = self.cooldowns.lock().strike(
                            url,
                            options.cooldown_base(),
                            error.is_rate_limit(),
                            Instant::now(),
                        );
                        tracing::warn!(
                            url = %url,
                            strikes = strikes,
                            delay_ms = delay.as_millis() as u64,
                            "cooling down endpoint"
                        );
                    }
                    tracing::error!(
                        url = %url,
                        method = %request.method,
                        error = %error,
                        "consensus rpc request failed"
                    );
                }
            }
        }
    }
}

/// `ceil(collected × ratio)` as a vote count.
fn quorum_needed(collected: usize, ratio: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let needed = (collected as f64 * ratio).ceil() as usize;
    needed
}

/// Websocket endpoints cannot serve one-shot consensus posts.
fn is_websocket_url(url: &str) -> bool {
    url.starts_with("wss://") || url.starts_with("ws://")
}
