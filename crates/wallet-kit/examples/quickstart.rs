//! Quickstart - connect, prepare, write
//!
//! Covers: connecting an unlocked node account, watching the account,
//! preparing a contract write through the query cache, sending it
//!
//! Run against a local dev node (anvil, hardhat) on 127.0.0.1:8545:
//!   cargo run --example quickstart
//!
//! Point it elsewhere with:
//!   WALLET_KIT_CHAIN_ID=31337
//!   WALLET_KIT_RPC_URL=http://127.0.0.1:8545
//!   PET_CONTRACT=0x...

use std::sync::Arc;
use std::time::Duration;

use wallet_kit::*;

const DEFAULT_CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

// ============================================================================
// 1. Connect
// ============================================================================

async fn connect(client: &Client) -> Result<(), Error> {
    println!("=== Connect ===\n");

    let rpc = client
        .provider(client.chain_id())
        .ok_or_else(|| Error::Config("no provider for the active chain".to_string()))?;

    let mut watcher = watch_account(client);
    client.connect(Arc::new(JsonRpcConnector::new(rpc))).await?;

    if let Some(account) = watcher.changed().await {
        println!("Connected as {:?}", account.address);
    }
    println!("Active chain: {}", client.chain_id());

    Ok(())
}

// ============================================================================
// 2. Prepare and write
// ============================================================================

async fn feed(client: &Client, contract: &str) -> Result<(), Error> {
    println!("\n=== Prepare ===\n");

    let pet = Arc::new(SelectorInterface::new().function("feed(uint256)"));
    let prepared = client
        .prepare_contract_write(contract, pet, "feed")
        .arg(3)
        .stale_time(Duration::from_secs(30))
        .suspense(true)
        .on_error(|e| eprintln!("prepare failed: {}", e))
        .await?;

    println!("Phase: {:?}", prepared.phase);
    if !prepared.config.is_prepared() {
        println!("Nothing to send");
        return Ok(());
    }
    println!("Request: {:?}", prepared.config.request);

    println!("\n=== Write ===\n");
    let hash = client.write_contract(&prepared.config).await?;
    println!("Sent {}", hash);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_kit=debug".into()),
        )
        .init();

    let client = if std::env::var("WALLET_KIT_RPC_URL").is_ok() {
        Client::from_env()?
    } else {
        Client::local().build()?
    };
    let contract = std::env::var("PET_CONTRACT").unwrap_or_else(|_| DEFAULT_CONTRACT.to_string());

    connect(&client).await?;
    feed(&client, &contract).await?;

    client.disconnect().await;
    Ok(())
}
