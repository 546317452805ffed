//! Endpoint health and latency probing.
//!
//! Each endpoint gets a dual probe: a chain-head fetch and a bytecode read
//! of a known, stable contract (Permit2, deployed at the same address on
//! every supported network). An endpoint passes only if both requests
//! succeed within the timeout and the bytecode prefix matches the expected
//! constant — a cheap proof the endpoint serves real, current chain state
//! rather than a stub or a wildly forked chain.
//!
//! After all probes complete, endpoints whose reported block number
//! disagrees with the majority are dropped from the latency map even if
//! individually valid, so a stale or forked node can never be selected as
//! fastest.

use crate::{
    transport::Transport,
    types::{JsonRpcRequest, LatencyMap, RpcEndpoint},
};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

/// Canonical Permit2 deployment address, identical across networks.
pub const PERMIT2_ADDRESS: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";

/// Expected prefix of the Permit2 runtime bytecode.
pub const PERMIT2_BYTECODE_PREFIX: &str = "0x604060808152600";

/// Outcome of probing a single endpoint. Transient: produced and consumed
/// within one probe cycle.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub url: String,
    pub success: bool,
    /// Max of the two request durations; a conservative estimate of
    /// round-trip cost under load.
    pub duration: Duration,
    pub block_number: Option<String>,
    pub bytecode_valid: bool,
}

/// Aggregated outcome of one probe cycle.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    /// Latencies of valid, in-sync endpoints. Empty when nothing passed.
    pub latencies: LatencyMap,
    /// Raw per-endpoint results, including failures.
    pub results: Vec<ProbeResult>,
}

/// Issues dual-request health probes over a set of endpoints in parallel.
#[derive(Clone)]
pub struct HealthProbe {
    transport: Arc<dyn Transport>,
}

impl HealthProbe {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Measures all endpoints concurrently.
    ///
    /// A single endpoint's failure never aborts the batch; it is simply
    /// omitted from the returned latency map. If every endpoint fails the
    /// map is empty and the caller must treat that as "no usable
    /// endpoint".
    pub async fn measure(&self, endpoints: &[RpcEndpoint], timeout: Duration) -> ProbeOutcome {
        let probes = endpoints.iter().map(|endpoint| self.probe_endpoint(&endpoint.url, timeout));
        let results = futures_util::future::join_all(probes).await;

        let majority_block = majority_block_number(&results);
        if let Some(block) = &majority_block {
            tracing::debug!(block = %block, probed = results.len(), "majority chain head determined");
        }

        let mut latencies = LatencyMap::new();
        for result in &results {
            if !result.success {
                continue;
            }
            if let (Some(block), Some(majority)) = (&result.block_number, &majority_block) {
                if block != majority {
                    tracing::warn!(
                        url = %result.url,
                        block = %block,
                        majority = %majority,
                        "excluding out-of-sync endpoint"
                    );
                    continue;
                }
            }
            latencies.insert(result.url.clone(), result.duration.as_secs_f64() * 1000.0);
        }

        ProbeOutcome { latencies, results }
    }

    /// Runs the dual probe against one url, both requests in parallel.
    async fn probe_endpoint(&self, url: &str, timeout: Duration) -> ProbeResult {
        let block_request =
            JsonRpcRequest::new("eth_getBlockByNumber", Some(serde_json::json!(["latest", false])), 1);
        let code_request = JsonRpcRequest::new(
            "eth_getCode",
            Some(serde_json::json!([PERMIT2_ADDRESS, "latest"])),
            1,
        );

        let timed_post = |request: JsonRpcRequest| async move {
            let started = Instant::now();
            let outcome = self.transport.post(url, &request, timeout).await;
            (outcome, started.elapsed())
        };

        let ((block_outcome, block_duration), (code_outcome, code_duration)) =
            tokio::join!(timed_post(block_request), timed_post(code_request));

        let duration = block_duration.max(code_duration);

        let block_number = block_outcome.as_ref().ok().and_then(|response| {
            response
                .result
                .as_ref()
                .and_then(|result| result.get("number"))
                .and_then(|number| number.as_str())
                .map(ToString::to_string)
        });

        let bytecode_valid = code_outcome.as_ref().ok().is_some_and(|response| {
            response
                .result
                .as_ref()
                .and_then(|result| result.as_str())
                .is_some_and(is_known_bytecode)
        });

        let block_ok = block_outcome.as_ref().is_ok_and(|r| r.result.is_some());
        let success = block_ok && bytecode_valid;

        if let Err(e) = &block_outcome {
            tracing::debug!(url = %url, error = %e, "chain head probe failed");
        }
        if let Err(e) = &code_outcome {
            tracing::debug!(url = %url, error = %e, "bytecode probe failed");
        }
        tracing::debug!(
            url = %url,
            success = success,
            duration_ms = duration.as_millis() as u64,
            "probe finished"
        );

        ProbeResult { url: url.to_string(), success, duration, block_number, bytecode_valid }
    }
}

/// Checks the Permit2 bytecode prefix.
fn is_known_bytecode(bytecode: &str) -> bool {
    bytecode.starts_with(PERMIT2_BYTECODE_PREFIX)
}

/// Tallies reported block numbers and returns the majority value.
///
/// Ties are broken by insertion order: the first-seen value wins. This is
/// an explicit policy so repeated probe cycles over the same responses
/// stay deterministic.
fn majority_block_number(results: &[ProbeResult]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for result in results {
        let Some(block) = &result.block_number else { continue };
        if let Some(entry) = counts.iter_mut().find(|entry| entry.0 == block.as_str()) {
            entry.1 += 1;
        } else {
            counts.push((block.as_str(), 1));
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        match best {
            // Strictly greater keeps the first-seen value on ties.
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value.to_string())
}
