//! Integration tests for racing call dispatch and failover.

use crate::mock_infrastructure::{init_tracing, RpcMock};
use hydra_core::{ChainRegistry, PoolConfig, PoolError, RpcEndpoint, RpcPool};
use serde_json::json;

fn pool_config(urls: &[String]) -> PoolConfig {
    let mut config = PoolConfig::new("31337");
    config.injected_endpoints = urls.iter().map(RpcEndpoint::untracked).collect();
    config.probe_timeout_ms = 2000;
    config.call_timeout_ms = 2000;
    config.retry.retry_count = 2;
    config.retry.retry_delay_ms = 10;
    config
}

fn make_pool(config: PoolConfig) -> RpcPool {
    RpcPool::new(config, &ChainRegistry::empty()).expect("transport builds")
}

#[tokio::test]
async fn test_failing_endpoint_loses_race_to_healthy_sibling() {
    init_tracing();
    let mut unstable = RpcMock::start().await;
    let mut stable = RpcMock::start().await;
    // Both probe healthy; only `stable` can actually serve calls.
    unstable.mock_healthy_probe("0x10").await;
    unstable.mock_method_status("eth_chainId", 500).await;
    stable.mock_healthy_probe("0x10").await;
    stable.mock_method("eth_chainId", &json!("0x7a69")).await;

    let pool = make_pool(pool_config(&[unstable.url(), stable.url()]));
    pool.init().await.unwrap();

    let value = pool.call("eth_chainId", None).await.unwrap();
    assert_eq!(value, json!("0x7a69"));
}

#[tokio::test]
async fn test_rpc_error_fails_over_inside_batch() {
    init_tracing();
    let mut reverting = RpcMock::start().await;
    let mut serving = RpcMock::start().await;
    reverting.mock_healthy_probe("0x10").await;
    reverting.mock_method_rpc_error("eth_call", -32000, "execution reverted").await;
    serving.mock_healthy_probe("0x10").await;
    serving.mock_method("eth_call", &json!("0x01")).await;

    let pool = make_pool(pool_config(&[reverting.url(), serving.url()]));
    pool.init().await.unwrap();

    let value = pool.call("eth_call", Some(json!([{ "to": "0x0" }, "latest"]))).await.unwrap();
    assert_eq!(value, json!("0x01"));
}

#[tokio::test]
async fn test_exhaustion_after_all_sweeps_fail() {
    init_tracing();
    let mut flaky_a = RpcMock::start().await;
    let mut flaky_b = RpcMock::start().await;
    flaky_a.mock_healthy_probe("0x10").await;
    flaky_a.mock_method_status("eth_chainId", 502).await;
    flaky_b.mock_healthy_probe("0x10").await;
    flaky_b.mock_method_status("eth_chainId", 503).await;

    let pool = make_pool(pool_config(&[flaky_a.url(), flaky_b.url()]));
    pool.init().await.unwrap();

    let error = pool.call("eth_chainId", None).await.unwrap_err();
    match error {
        PoolError::BatchExhausted { method, sweeps, .. } => {
            assert_eq!(method, "eth_chainId");
            assert_eq!(sweeps, 2);
        }
        other => panic!("expected BatchExhausted, got {other:?}"),
    }
}
