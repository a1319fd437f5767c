//! Integration tests for prepared contract writes.

use std::future::IntoFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde_json::json;
use wallet_kit::*;

use crate::common::*;

fn client_with(preparer: Arc<CountingPreparer>) -> Client {
    Client::mainnet().preparer(preparer).build().unwrap()
}

// =============================================================================
// Cache keys
// =============================================================================

fn feed_args(args: Vec<serde_json::Value>) -> PrepareWriteArgs {
    PrepareWriteArgs {
        address_or_name: CONTRACT.parse().unwrap(),
        chain_id: None,
        function_name: "feed".to_string(),
        args,
        overrides: None,
        contract_interface: feed_interface(),
    }
}

#[test]
fn test_key_ignores_member_order() {
    let env = KeyEnvironment {
        active_chain_id: 1,
        signer_address: Some(address(SIGNER)),
    };
    let a = query_key(&feed_args(vec![json!({ "food": "kibble", "amount": 2 })]), env);
    let b = query_key(&feed_args(vec![json!({ "amount": 2, "food": "kibble" })]), env);

    assert_eq!(a, b);
    assert_eq!(a.hash_key().unwrap(), b.hash_key().unwrap());
}

#[test]
fn test_key_depends_on_signer_and_chain() {
    let args = feed_args(vec![]);
    let base = KeyEnvironment {
        active_chain_id: 1,
        signer_address: Some(address(SIGNER)),
    };
    let other_signer = KeyEnvironment {
        signer_address: Some(address("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")),
        ..base
    };
    let other_chain = KeyEnvironment {
        active_chain_id: 5,
        ..base
    };

    let key = query_key(&args, base).hash_key().unwrap();
    assert_ne!(key, query_key(&args, other_signer).hash_key().unwrap());
    assert_ne!(key, query_key(&args, other_chain).hash_key().unwrap());
}

const OTHER_CONTRACT: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

#[test]
fn test_key_depends_on_every_call_parameter() {
    let env = KeyEnvironment {
        active_chain_id: 1,
        signer_address: Some(address(SIGNER)),
    };
    let base = feed_args(vec![json!(1)]);
    let key = query_key(&base, env).hash_key().unwrap();

    let variants = [
        PrepareWriteArgs {
            address_or_name: OTHER_CONTRACT.parse().unwrap(),
            ..base.clone()
        },
        PrepareWriteArgs {
            function_name: "play".to_string(),
            ..base.clone()
        },
        PrepareWriteArgs {
            chain_id: Some(1),
            ..base.clone()
        },
        PrepareWriteArgs {
            args: vec![json!(2)],
            ..base.clone()
        },
        PrepareWriteArgs {
            overrides: Some(Overrides::default().gas_limit(50_000)),
            ..base.clone()
        },
    ];
    for variant in &variants {
        assert_ne!(key, query_key(variant, env).hash_key().unwrap(), "{:?}", variant);
    }

    let no_signer = KeyEnvironment {
        signer_address: None,
        ..env
    };
    assert_ne!(key, query_key(&base, no_signer).hash_key().unwrap());
}

#[tokio::test]
async fn test_each_call_parameter_gets_its_own_entry() {
    let preparer = CountingPreparer::new(mocked_request());
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let prepare = |contract: &'static str, function: &'static str| {
        client
            .prepare_contract_write(contract, feed_interface(), function)
            .arg(json!(1))
            .stale_time(Duration::from_secs(60))
            .suspense(true)
    };

    prepare(CONTRACT, "feed").await.unwrap();
    // Same parameters: served from the cache
    prepare(CONTRACT, "feed").await.unwrap();
    assert_eq!(preparer.calls(), 1);

    prepare(OTHER_CONTRACT, "feed").await.unwrap();
    prepare(CONTRACT, "play").await.unwrap();
    prepare(CONTRACT, "feed").chain_id(1).await.unwrap();
    prepare(CONTRACT, "feed").arg(json!(2)).await.unwrap();
    prepare(CONTRACT, "feed")
        .overrides(Overrides::default().gas_limit(50_000))
        .await
        .unwrap();

    assert_eq!(preparer.calls(), 6);
    assert_eq!(client.query_client().len(), 6);
}

// =============================================================================
// Enablement
// =============================================================================

#[tokio::test]
async fn test_no_signer_never_prepares() {
    let preparer = CountingPreparer::new(mocked_request());
    let client = client_with(preparer.clone());

    let result = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap();

    assert_eq!(preparer.calls(), 0);
    assert_eq!(result.phase, PreparePhase::Disabled);
    assert_eq!(result.status, QueryStatus::Idle);
    assert!(result.data.is_none());
    assert_eq!(result.config.mode, PrepareMode::Disabled);
    assert!(result.config.request.is_none());
}

#[tokio::test]
async fn test_disabled_never_prepares() {
    let preparer = CountingPreparer::new(mocked_request());
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let result = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .enabled(false)
        .suspense(true)
        .await
        .unwrap();

    assert_eq!(preparer.calls(), 0);
    assert_eq!(result.phase, PreparePhase::Disabled);
    assert!(!result.config.is_prepared());
}

// =============================================================================
// Preparing
// =============================================================================

#[tokio::test]
async fn test_prepares_once_with_signer() {
    init_tracing();
    let preparer = CountingPreparer::new(mocked_request());
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let result = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap();

    assert_eq!(preparer.calls(), 1);
    let configs = preparer.configs.lock().unwrap();
    assert_eq!(configs[0].address_or_name, CONTRACT.parse().unwrap());
    assert_eq!(configs[0].function_name, "feed");
    assert_eq!(configs[0].chain_id, None);
    let signer = configs[0].signer.as_ref().unwrap();
    assert_eq!(*signer.address(), address(SIGNER));

    assert!(result.is_success());
    assert_eq!(result.phase, PreparePhase::Settled(SettledOutcome::Success));
    assert_eq!(result.config.request, Some(mocked_request()));
    assert_eq!(result.config.mode, PrepareMode::Prepared);
    assert!(result.config.is_prepared());
}

#[tokio::test]
async fn test_concurrent_prepares_share_one_call() {
    let preparer = CountingPreparer::slow(mocked_request(), Duration::from_millis(50));
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let prepare = || {
        client
            .prepare_contract_write(CONTRACT, feed_interface(), "feed")
            .arg(json!({ "food": "kibble", "amount": 2 }))
            .suspense(true)
            .into_future()
    };
    let (a, b) = tokio::join!(prepare(), prepare());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(preparer.calls(), 1);
    assert_eq!(a.data, b.data);
    assert_eq!(a.config.request, b.config.request);
}

#[tokio::test]
async fn test_fresh_result_is_served_from_cache() {
    let preparer = CountingPreparer::new(mocked_request());
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    for _ in 0..3 {
        let result = client
            .prepare_contract_write(CONTRACT, feed_interface(), "feed")
            .stale_time(Duration::from_secs(60))
            .suspense(true)
            .await
            .unwrap();
        assert!(result.config.is_prepared());
    }
    assert_eq!(preparer.calls(), 1);

    // Forced refresh
    client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .stale_time(Duration::from_secs(60))
        .suspense(true)
        .refetch()
        .await
        .unwrap();
    assert_eq!(preparer.calls(), 2);
}

#[tokio::test]
async fn test_new_signer_gets_new_entry() {
    let preparer = CountingPreparer::new(mocked_request());
    let client = client_with(preparer.clone());

    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;
    client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .stale_time(Duration::from_secs(60))
        .suspense(true)
        .await
        .unwrap();

    client.disconnect().await;
    let other = address("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    connect(&client, StaticSigner::new(other, 1)).await;
    client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .stale_time(Duration::from_secs(60))
        .suspense(true)
        .await
        .unwrap();

    assert_eq!(preparer.calls(), 2);
    let configs = preparer.configs.lock().unwrap();
    assert_eq!(*configs[1].signer.as_ref().unwrap().address(), other);
    assert_eq!(client.query_client().len(), 2);
}

#[tokio::test]
async fn test_non_suspense_returns_while_fetching() {
    let preparer = CountingPreparer::slow(mocked_request(), Duration::from_millis(50));
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let first = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .await
        .unwrap();
    assert_eq!(first.phase, PreparePhase::Fetching);
    assert!(first.is_loading());
    assert!(first.is_fetching());
    assert!(!first.config.is_prepared());

    // Joins the running call
    let second = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap();
    assert!(second.config.is_prepared());
    assert_eq!(preparer.calls(), 1);
}

#[tokio::test]
async fn test_default_preparer_estimates_gas() {
    let client = Client::mainnet().build().unwrap();
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let result = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .overrides(Overrides::default().value(7))
        .suspense(true)
        .await
        .unwrap();

    let request = result.config.request.unwrap();
    assert_eq!(request.gas, Some(21_000));
    assert_eq!(request.from, Some(address(SIGNER)));
    assert_eq!(request.to, Some(address(CONTRACT)));
    assert_eq!(request.value, Some(7));
    assert_eq!(
        request.data.unwrap().selector(),
        Some(function_selector("feed()"))
    );
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_prepare_error_is_reported_in_result() {
    let preparer = CountingPreparer::failing();
    let client = client_with(preparer.clone());
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let errors = Arc::new(AtomicU32::new(0));
    let seen = errors.clone();
    let result = client
        .prepare_contract_write(CONTRACT, feed_interface(), "feed")
        .suspense(true)
        .on_error(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert!(result.is_error());
    assert_eq!(result.phase, PreparePhase::Settled(SettledOutcome::Error));
    assert!(result.error.as_ref().unwrap().to_string().contains("not hungry"));
    assert_eq!(result.config.mode, PrepareMode::Disabled);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolved_name_fails_default_preparer() {
    let client = Client::mainnet().build().unwrap();
    connect(&client, StaticSigner::new(address(SIGNER), 1)).await;

    let result = client
        .prepare_contract_write("pets.eth", feed_interface(), "feed")
        .suspense(true)
        .await
        .unwrap();

    assert!(matches!(
        result.error.as_deref(),
        Some(Error::UnresolvedName(name)) if name == "pets.eth"
    ));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let client = Client::mainnet().build().unwrap();

    let err = tokio_test::block_on(
        client
            .prepare_contract_write("0x1234", feed_interface(), "feed")
            .into_future(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ParseAddress(_)));

    let err = tokio_test::block_on(
        client
            .prepare_contract_write(CONTRACT, feed_interface(), "  ")
            .into_future(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let err = tokio_test::block_on(
        client
            .prepare_contract_write(CONTRACT, feed_interface(), "feed")
            .retry(MAX_RETRY + 1)
            .into_future(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
