//! Racing call dispatch.
//!
//! Every outbound call is raced across fixed-size batches of the
//! best-known endpoints, ordered by measured latency. Within a batch all
//! members run concurrently and the first success wins; a batch fails only
//! when every member has failed. Batches are tried in order, and after a
//! full sweep over the list the dispatcher sleeps and starts over, up to a
//! configured number of sweeps. Only the final sweep's last batch failing
//! escalates to the caller.
//!
//! Batching by three bounds the worst-case fan-out cost while still
//! tolerating one or two simultaneously slow or unhealthy endpoints per
//! attempt.

use crate::{
    error::PoolError,
    transport::Transport,
    types::{JsonRpcRequest, LatencyMap},
};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::Duration,
};

/// Endpoints raced together per attempt.
const BATCH_SIZE: usize = 3;

/// Races calls across latency-ordered endpoint batches.
///
/// All typed call wrappers funnel through the single generic
/// [`invoke`](Self::invoke) entry point.
pub struct RacingDispatcher {
    transport: Arc<dyn Transport>,
    active_url: String,
    ordered_urls: Vec<String>,
    retry_count: u32,
    retry_delay: Duration,
    call_timeout: Duration,
    next_id: AtomicU64,
}

impl RacingDispatcher {
    /// Creates a dispatcher around the active endpoint and a
    /// latency-ascending candidate list.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        active_url: String,
        ordered_urls: Vec<String>,
        retry_count: u32,
        retry_delay: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            active_url,
            ordered_urls,
            retry_count,
            retry_delay,
            call_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// Sorts a latency snapshot into an ascending url list.
    #[must_use]
    pub fn order_by_latency(latencies: &LatencyMap) -> Vec<String> {
        let mut entries: Vec<(&String, &f64)> = latencies.iter().collect();
        entries.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));
        entries.into_iter().map(|(url, _)| url.clone()).collect()
    }

    /// Returns the url the dispatcher was built around.
    #[must_use]
    pub fn active_url(&self) -> &str {
        &self.active_url
    }

    /// Dispatches one JSON-RPC call through the racing/retry machinery and
    /// returns the `result` payload of the first successful response.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::BatchExhausted`] carrying the last underlying
    /// error once every batch of every sweep has failed.
    pub async fn invoke(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PoolError> {
        let mut ordered = self.ordered_urls.clone();
        if !ordered.iter().any(|url| url == &self.active_url) {
            ordered.insert(0, self.active_url.clone());
        }

        let request =
            JsonRpcRequest::new(method, params, self.next_id.fetch_add(1, Ordering::Relaxed));
        let sweeps = self.retry_count.max(1);
        let mut last_error: Option<PoolError> = None;

        for sweep in 1..=sweeps {
            let batch_count = ordered.chunks(BATCH_SIZE).count();
            for (batch_index, batch) in ordered.chunks(BATCH_SIZE).enumerate() {
                tracing::debug!(
                    method = %method,
                    sweep = sweep,
                    batch = ?batch,
                    "racing endpoint batch"
                );
                match self.race_batch(batch, &request).await {
                    Ok(value) => {
                        tracing::trace!(method = %method, "call resolved by racing batch");
                        return Ok(value);
                    }
                    Err(error) => {
                        let is_last_batch = batch_index + 1 == batch_count;
                        if sweep == sweeps && is_last_batch {
                            tracing::error!(
                                method = %method,
                                sweeps = sweeps,
                                error = %error,
                                "all endpoint batches exhausted"
                            );
                            return Err(PoolError::BatchExhausted {
                                method: method.to_string(),
                                sweeps,
                                source: Box::new(error),
                            });
                        }
                        tracing::debug!(
                            method = %method,
                            error = %error,
                            "batch failed, moving on"
                        );
                        last_error = Some(error);
                    }
                }
            }
            tokio::time::sleep(self.retry_delay).await;
        }

        // Unreachable in practice: the final sweep's last batch either
        // resolved or returned above. Kept for a total function.
        Err(PoolError::BatchExhausted {
            method: method.to_string(),
            sweeps,
            source: Box::new(last_error.unwrap_or(PoolError::Timeout)),
        })
    }

    /// Races every member of `batch` concurrently, resolving on the first
    /// success and rejecting with the last error once all have failed.
    ///
    /// The per-call timeout is enforced independently of the batch loop: a
    /// member exceeding it counts as a failed attempt, it does not abort
    /// its siblings.
    async fn race_batch(
        &self,
        batch: &[String],
        request: &JsonRpcRequest,
    ) -> Result<serde_json::Value, PoolError> {
        let attempts = batch.iter().map(|url| {
            let transport = Arc::clone(&self.transport);
            let timeout = self.call_timeout;
            async move {
                tracing::debug!(url = %url, method = %request.method, "attempting rpc call");
                let outcome =
                    match tokio::time::timeout(timeout, transport.post(url, request, timeout)).await
                    {
                        Err(_) => Err(PoolError::Timeout),
                        Ok(sent) => sent.and_then(|response| {
                            response.result.ok_or_else(|| {
                                PoolError::InvalidResponse("response carried no result".to_string())
                            })
                        }),
                    };
                (url, outcome)
            }
        });

        let mut pending: Vec<_> = attempts.map(Box::pin).collect();
        let mut last_error = PoolError::Connection("empty batch".to_string());

        while !pending.is_empty() {
            let ((url, outcome), _index, remaining) =
                futures_util::future::select_all(pending).await;
            pending = remaining;

            match outcome {
                Ok(value) => {
                    tracing::trace!(url = %url, method = %request.method, "rpc call won race");
                    return Ok(value);
                }
                Err(error) => {
                    tracing::debug!(
                        url = %url,
                        method = %request.method,
                        error = %error,
                        "endpoint attempt failed"
                    );
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}
