//! End-to-end tests against a local JSON-RPC node.
//!
//! Connects with [`JsonRpcConnector`], prepares with the default preparer
//! and sends through [`JsonRpcSigner`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use wallet_kit::*;

use crate::common::*;

const NODE_ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const HASH: &str = "0xabababababababababababababababababababababababababababababababab";

async fn node() -> MockNode {
    let mut results = HashMap::new();
    results.insert("eth_chainId", json!("0x7a69"));
    results.insert("eth_accounts", json!([NODE_ACCOUNT]));
    results.insert("eth_estimateGas", json!("0x5208"));
    results.insert("eth_sendTransaction", json!(HASH));
    MockNode::start(results).await
}

fn client_for(node: &MockNode) -> Client {
    Client::builder()
        .chain(Chain::custom(31_337, "Mock", node.url.clone()))
        .retry_config(RetryConfig {
            max_retries: 0,
            initial_delay_ms: 10,
            max_delay_ms: 10,
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_connect_prepare_and_send() {
    init_tracing();
    let node = node().await;
    let client = client_for(&node);

    let rpc = client.provider(31_337).unwrap();
    let data = client
        .connect(Arc::new(JsonRpcConnector::new(rpc)))
        .await
        .unwrap();
    assert_eq!(data.account, Some(address(NODE_ACCOUNT)));
    assert_eq!(client.chain_id(), 31_337);

    let prepared = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap();
    assert!(prepared.config.is_prepared());
    assert_eq!(prepared.config.request.as_ref().unwrap().gas, Some(21_000));

    let hash = client.write_contract(&prepared.config).await.unwrap();
    assert_eq!(hash.to_string(), HASH);

    assert_eq!(
        node.methods(),
        ["eth_chainId", "eth_accounts", "eth_estimateGas", "eth_sendTransaction"]
    );

    let sent = &node.requests_for("eth_sendTransaction")[0]["params"][0];
    assert_eq!(sent["from"], NODE_ACCOUNT);
    assert_eq!(sent["to"], CONTRACT);
    assert_eq!(sent["gas"], "0x5208");
    assert_eq!(
        sent["data"],
        format!("0x{}", hex::encode(function_selector("feed()")))
    );
    assert!(sent.get("value").is_none());
}

#[tokio::test]
async fn test_estimate_failure_is_query_error() {
    let mut results = HashMap::new();
    results.insert("eth_chainId", json!("0x7a69"));
    results.insert("eth_accounts", json!([NODE_ACCOUNT]));
    let node = MockNode::start(results).await;
    let client = client_for(&node);

    let rpc = client.provider(31_337).unwrap();
    client
        .connect(Arc::new(JsonRpcConnector::new(rpc)))
        .await
        .unwrap();

    let prepared = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap();

    assert!(prepared.is_error());
    assert!(matches!(
        prepared.error.as_deref(),
        Some(Error::Rpc(RpcError::Rpc { code: -32601, .. }))
    ));
    assert!(!prepared.config.is_prepared());
}

#[tokio::test]
async fn test_signer_on_other_chain_disables_prepare() {
    let node = node().await;
    let client = client_for(&node);

    let rpc = client.provider(31_337).unwrap();
    client
        .connect(Arc::new(JsonRpcConnector::new(rpc)))
        .await
        .unwrap();

    // The connector cannot hand out a signer for chain 1
    let prepared = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .chain_id(1)
        .suspense(true)
        .await
        .unwrap();

    assert_eq!(prepared.phase, PreparePhase::Disabled);
    assert!(node.requests_for("eth_estimateGas").is_empty());
}
