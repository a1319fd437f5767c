//! Integration tests for sending prepared writes.

use wallet_kit::*;

use crate::common::*;

async fn prepare(client: &Client) -> PreparedConfig {
    client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap()
        .config
}

#[tokio::test]
async fn test_write_sends_prepared_request() {
    let client = Client::mainnet()
        .preparer(CountingPreparer::new(mocked_request()))
        .build()
        .unwrap();
    let signer = StaticSigner::new(address(SIGNER), 1);
    connect(&client, signer.clone()).await;

    let config = prepare(&client).await;
    let hash = client.write_contract(&config).await.unwrap();

    assert_eq!(hash, TxHash::from_bytes([0x11; 32]));
    let sent = signer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], mocked_request());
}

#[tokio::test]
async fn test_write_requires_prepared_config() {
    let client = Client::mainnet()
        .preparer(CountingPreparer::new(mocked_request()))
        .build()
        .unwrap();

    // No signer, so nothing is prepared
    let config = prepare(&client).await;
    assert_eq!(config.mode, PrepareMode::Disabled);

    let err = write_contract(&client, &config).await.unwrap_err();
    assert!(matches!(err, Error::NotPrepared));
}

#[tokio::test]
async fn test_write_requires_connection() {
    let client = Client::mainnet()
        .preparer(CountingPreparer::new(mocked_request()))
        .build()
        .unwrap();
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;
    let config = prepare(&client).await;
    assert!(config.is_prepared());

    client.disconnect().await;
    let err = client.write_contract(&config).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
}

#[tokio::test]
async fn test_write_rejects_chain_mismatch() {
    let request = TransactionRequest {
        chain_id: Some(5),
        ..mocked_request()
    };
    let client = Client::mainnet()
        .preparer(CountingPreparer::new(request))
        .build()
        .unwrap();
    let signer = StaticSigner::new(address(SIGNER), 1);
    connect(&client, signer.clone()).await;

    let config = prepare(&client).await;
    let err = client.write_contract(&config).await.unwrap_err();

    assert!(matches!(err, Error::ChainMismatch { expected: 5, actual: 1 }));
    assert!(signer.sent.lock().unwrap().is_empty());
}
