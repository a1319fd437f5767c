//! Integration tests for the account accessor and watcher.

use std::sync::Arc;

use wallet_kit::*;

use crate::common::*;

const BEEF: &str = "0xbeefbeefbeefbeefbeefbeefbeefbeefbeefbeef";

#[tokio::test]
async fn test_account_is_empty_without_connection() {
    let client = Client::mainnet().build().unwrap();

    let account = get_account(&client);
    assert!(account.address.is_none());
    assert!(account.connector.is_none());
    assert!(!account.is_connected());
}

#[tokio::test]
async fn test_account_reports_connected_address_and_connector() {
    let client = Client::mainnet().build().unwrap();
    let connector = connect(&client, StaticSigner::new(address(BEEF), 1)).await;

    let account = get_account(&client);
    assert_eq!(account.address, Some(address(BEEF)));

    let expected: Arc<dyn Connector> = connector;
    assert!(Arc::ptr_eq(account.connector.as_ref().unwrap(), &expected));
    assert_eq!(client.account().address, account.address);
}

#[tokio::test]
async fn test_failed_connect_leaves_account_empty() {
    let client = Client::mainnet().build().unwrap();
    let connector = Arc::new(MockConnector::new(StaticSigner::new(address(BEEF), 1), 1));
    connector.fail_next_connect();

    let err = client.connect(connector).await.unwrap_err();
    assert!(matches!(err, Error::Connector(ConnectorError::UserRejected)));
    assert!(get_account(&client).address.is_none());
    assert_eq!(client.status(), Status::Disconnected);
}

#[tokio::test]
async fn test_account_follows_connector_events() {
    let client = Client::mainnet().build().unwrap();
    connect(&client, StaticSigner::new(address(BEEF), 1)).await;

    let next = address("0x1111111111111111111111111111111111111111");
    client.handle_event(ConnectorEvent::Change {
        account: Some(next),
        chain_id: None,
    });
    assert_eq!(get_account(&client).address, Some(next));

    client.handle_event(ConnectorEvent::Disconnect);
    assert!(get_account(&client).connector.is_none());
}

#[tokio::test]
async fn test_watcher_sees_each_change_once() {
    let client = Client::mainnet().build().unwrap();
    let mut watcher = watch_account(&client);

    connect(&client, StaticSigner::new(address(BEEF), 1)).await;
    let account = watcher.changed().await.unwrap();
    assert_eq!(account.address, Some(address(BEEF)));

    // Chain switch only: same account, no notification
    client.handle_event(ConnectorEvent::Change {
        account: None,
        chain_id: Some(1),
    });
    client.disconnect().await;

    let account = watcher.changed().await.unwrap();
    assert!(account.address.is_none());
    assert!(watcher.current().connector.is_none());
}
