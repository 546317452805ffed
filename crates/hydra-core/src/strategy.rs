//! Endpoint selection strategies.
//!
//! A strategy turns a probe pass over the candidate endpoint set into a
//! single active endpoint. Two policies exist:
//!
//! - [`Strategy::Fastest`] probes every endpoint in parallel and picks the
//!   lowest-latency survivor. Best steady-state choice.
//! - [`Strategy::FirstHealthy`] shuffles the secure-transport candidates
//!   and probes them **one at a time**, stopping at the first pass. The
//!   sequential order is intentional: it avoids a full parallel fan-out
//!   when a single working endpoint suffices (cold start on constrained
//!   clients).

use crate::{
    probe::HealthProbe,
    types::{LatencyMap, RpcEndpoint},
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The outcome of a successful strategy run: the chosen endpoint and the
/// latency snapshot measured on the way.
#[derive(Debug, Clone)]
pub struct Selection {
    pub url: String,
    pub latencies: LatencyMap,
}

/// Endpoint selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Probe everything, pick the lowest latency.
    #[default]
    Fastest,
    /// Probe a randomized subset sequentially, stop at the first pass.
    FirstHealthy,
}

impl Strategy {
    /// Runs the strategy over `endpoints`, returning `None` when no
    /// endpoint passes its health probe.
    pub async fn select(
        self,
        probe: &HealthProbe,
        endpoints: &[RpcEndpoint],
        timeout: Duration,
        allow_insecure_loopback: bool,
    ) -> Option<Selection> {
        match self {
            Self::Fastest => Self::select_fastest(probe, endpoints, timeout).await,
            Self::FirstHealthy => {
                Self::select_first_healthy(probe, endpoints, timeout, allow_insecure_loopback).await
            }
        }
    }

    async fn select_fastest(
        probe: &HealthProbe,
        endpoints: &[RpcEndpoint],
        timeout: Duration,
    ) -> Option<Selection> {
        let outcome = probe.measure(endpoints, timeout).await;
        let (url, latency) = outcome
            .latencies
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        tracing::debug!(url = %url, latency_ms = *latency, "fastest endpoint selected");
        Some(Selection { url: url.clone(), latencies: outcome.latencies })
    }

    async fn select_first_healthy(
        probe: &HealthProbe,
        endpoints: &[RpcEndpoint],
        timeout: Duration,
        allow_insecure_loopback: bool,
    ) -> Option<Selection> {
        let mut candidates: Vec<&RpcEndpoint> = endpoints
            .iter()
            .filter(|endpoint| {
                endpoint.url.starts_with("https://")
                    || (allow_insecure_loopback && is_loopback_http(&endpoint.url))
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.shuffle(&mut rand::rng());

        for endpoint in candidates {
            let outcome = probe.measure(std::slice::from_ref(endpoint), timeout).await;
            if !outcome.latencies.is_empty() {
                tracing::debug!(url = %endpoint.url, "first healthy endpoint selected");
                return Some(Selection { url: endpoint.url.clone(), latencies: outcome.latencies });
            }
        }
        None
    }
}

/// Matches plain-http urls pointing at the local host.
fn is_loopback_http(url: &str) -> bool {
    url.starts_with("http://127.0.0.1")
        || url.starts_with("http://localhost")
        || url.starts_with("http://[::1]")
}
