//! Integration tests for quorum and BFT consensus over live mock servers.

use crate::mock_infrastructure::{init_tracing, RpcMock};
use hydra_core::{
    ChainRegistry, ConsensusOptions, JsonRpcRequest, PoolConfig, PoolError, RpcEndpoint, RpcPool,
};
use serde_json::json;
use serial_test::serial;
use std::time::Duration;

fn pool_over(urls: &[String]) -> RpcPool {
    let mut config = PoolConfig::new("31337");
    config.injected_endpoints = urls.iter().map(RpcEndpoint::untracked).collect();
    RpcPool::new(config, &ChainRegistry::empty()).expect("transport builds")
}

fn chain_id_request() -> JsonRpcRequest {
    JsonRpcRequest::new("eth_chainId", None, 1)
}

fn options() -> ConsensusOptions {
    ConsensusOptions { timeout_ms: 2000, concurrency: 4, cooldown_ms: 500 }
}

#[tokio::test]
async fn test_quorum_reached_across_three_servers() {
    init_tracing();
    let mut node_a = RpcMock::start().await;
    let mut node_b = RpcMock::start().await;
    let mut node_c = RpcMock::start().await;
    for node in [&mut node_a, &mut node_b, &mut node_c] {
        node.mock_method("eth_chainId", &json!("0x7a69")).await;
    }

    let pool = pool_over(&[node_a.url(), node_b.url(), node_c.url()]);
    let value = pool.consensus(&chain_id_request(), 0.5, &options()).await.unwrap();
    assert_eq!(value, json!("0x7a69"));
}

#[tokio::test]
async fn test_object_results_agree_across_key_orders() {
    init_tracing();
    let mut ordered = RpcMock::start().await;
    let mut reversed_a = RpcMock::start().await;
    let mut reversed_b = RpcMock::start().await;
    ordered
        .mock_method("eth_getBlockByNumber", &serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap())
        .await;
    for node in [&mut reversed_a, &mut reversed_b] {
        node.mock_method("eth_getBlockByNumber", &serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap())
            .await;
    }

    let pool = pool_over(&[ordered.url(), reversed_a.url(), reversed_b.url()]);
    let request =
        JsonRpcRequest::new("eth_getBlockByNumber", Some(json!(["latest", false])), 1);
    let value = pool.consensus(&request, 0.5, &options()).await.unwrap();
    assert_eq!(value, json!({"a": 1, "b": 2}));
}

#[tokio::test]
async fn test_disagreeing_servers_below_quorum() {
    init_tracing();
    let mut node_a = RpcMock::start().await;
    let mut node_b = RpcMock::start().await;
    let mut node_c = RpcMock::start().await;
    node_a.mock_method("eth_chainId", &json!("0x1")).await;
    node_b.mock_method("eth_chainId", &json!("0x2")).await;
    node_c.mock_method("eth_chainId", &json!("0x3")).await;

    let pool = pool_over(&[node_a.url(), node_b.url(), node_c.url()]);
    let error = pool.consensus(&chain_id_request(), 0.9, &options()).await.unwrap_err();
    assert!(matches!(error, PoolError::ConsensusNotReached { .. }), "got {error:?}");
}

#[tokio::test]
async fn test_single_endpoint_cannot_vote_alone() {
    let pool = pool_over(&["https://lonely.example".to_string()]);
    let error = pool.consensus(&chain_id_request(), 0.5, &options()).await.unwrap_err();
    assert!(matches!(error, PoolError::SingleEndpoint));
}

#[tokio::test]
async fn test_websocket_only_pool_is_empty() {
    let pool = pool_over(&["wss://ws-a.example".to_string(), "wss://ws-b.example".to_string()]);
    let error = pool.consensus(&chain_id_request(), 0.5, &options()).await.unwrap_err();
    assert!(matches!(error, PoolError::EmptyPool { .. }));
}

#[tokio::test]
#[serial]
async fn test_rate_limited_server_cools_down_and_returns() {
    init_tracing();
    let mut node_a = RpcMock::start().await;
    let mut node_b = RpcMock::start().await;
    let mut limited = RpcMock::start().await;
    node_a.mock_method("eth_chainId", &json!("0x7a69")).await;
    node_b.mock_method("eth_chainId", &json!("0x7a69")).await;
    limited.mock_all_status(429).await;

    let pool = pool_over(&[node_a.url(), node_b.url(), limited.url()]);
    let limited_url = limited.url();

    // First call strikes the rate-limited server (base cooldown 500ms).
    pool.consensus(&chain_id_request(), 0.5, &options()).await.unwrap();
    assert_eq!(pool.consensus_engine().cooldown_strikes(&limited_url), 1);

    // Within the window it is excluded, so the strike count is frozen.
    pool.consensus(&chain_id_request(), 0.5, &options()).await.unwrap();
    assert_eq!(pool.consensus_engine().cooldown_strikes(&limited_url), 1);

    // Once the window has elapsed the server is queried again and the
    // strike count grows.
    tokio::time::sleep(Duration::from_millis(700)).await;
    pool.consensus(&chain_id_request(), 0.5, &options()).await.unwrap();
    assert_eq!(pool.consensus_engine().cooldown_strikes(&limited_url), 2);
}

#[tokio::test]
async fn test_bft_issues_exactly_one_round_of_requests() {
    init_tracing();
    let mut node_a = RpcMock::start().await;
    let mut node_b = RpcMock::start().await;
    let mut node_c = RpcMock::start().await;
    node_a.mock_method_expect("eth_chainId", &json!("0x1"), 1).await;
    node_b.mock_method_expect("eth_chainId", &json!("0x2"), 1).await;
    node_c.mock_method_expect("eth_chainId", &json!("0x3"), 1).await;

    let pool = pool_over(&[node_a.url(), node_b.url(), node_c.url()]);
    let error = pool
        .bft_consensus(&chain_id_request(), 0.90, 0.80, &options())
        .await
        .unwrap_err();
    assert!(matches!(error, PoolError::BftConsensusNotReached { .. }), "got {error:?}");

    // Each server must have been asked exactly once despite the descent.
    node_a.assert_all().await;
    node_b.assert_all().await;
    node_c.assert_all().await;
}

#[tokio::test]
async fn test_bft_descends_to_two_of_three_majority() {
    init_tracing();
    let mut node_a = RpcMock::start().await;
    let mut node_b = RpcMock::start().await;
    let mut outlier = RpcMock::start().await;
    node_a.mock_method("eth_chainId", &json!("0x7a69")).await;
    node_b.mock_method("eth_chainId", &json!("0x7a69")).await;
    outlier.mock_method("eth_chainId", &json!("0xdead")).await;

    let pool = pool_over(&[node_a.url(), node_b.url(), outlier.url()]);
    let value = pool
        .bft_consensus(&chain_id_request(), 0.90, 0.50, &options())
        .await
        .unwrap();
    assert_eq!(value, json!("0x7a69"));
}
