//! Wallet state, prepared contract writes, and a keyed query cache for EVM
//! clients.
//!
//! **wallet-kit** keeps one [`Client`] per application. The client owns the
//! wallet session (connector, account, chain) and a [`QueryClient`] that
//! caches asynchronous reads by structured key.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wallet_kit::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wallet_kit::Error> {
//!     // Configure once
//!     let client = Client::local().build()?;
//!     let rpc = client.provider(client.chain_id()).expect("configured chain");
//!     client.connect(Arc::new(JsonRpcConnector::new(rpc))).await?;
//!
//!     // Prepare ahead of time
//!     let pet = Arc::new(SelectorInterface::new().function("feed()"));
//!     let prepared = client
//!         .prepare_contract_write("0xecb504d39723b0be0e3a9aa33d646642d1051ee1", pet, "feed")
//!         .await?;
//!
//!     // Send when the user confirms
//!     if prepared.config.is_prepared() {
//!         let hash = client.write_contract(&prepared.config).await?;
//!         println!("Sent {}", hash);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Design Principles
//!
//! 1. **Single entry point**: Everything hangs off the [`Client`]
//! 2. **Prepare early, send late**: Gas is estimated before the user clicks
//! 3. **Cache by key**: Equal parameters share one cache entry and one fetch
//!
//! # Core Types
//!
//! - [`Address`], [`AddressOrName`] - Contract and account addresses
//! - [`Overrides`] - Gas, fee, nonce and value overrides
//! - [`TransactionRequest`] - JSON-RPC transaction shape
//! - [`Chain`] - Chain id plus RPC endpoint
//!
//! # Query Keys
//!
//! Keys hash canonically, so member order in arguments does not matter:
//!
//! ```
//! use serde_json::json;
//! use wallet_kit::canonical_hash;
//!
//! let a = canonical_hash(&json!({ "food": "kibble", "amount": 1 })).unwrap();
//! let b = canonical_hash(&json!({ "amount": 1, "food": "kibble" })).unwrap();
//! assert_eq!(a, b);
//! ```

pub mod actions;
pub mod client;
pub mod contract;
pub mod error;
pub mod hooks;
pub mod query;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConnectorError, Error, ParseAddressError, RpcError};
pub use types::*;

pub use actions::{
    Account, EstimateGasPreparer, PrepareFuture, PrepareMode, PrepareWrite,
    PrepareWriteContractConfig, PreparedWrite, get_account, write_contract,
};
pub use client::{
    Client, ClientBuilder, ClientState, ConnectedChain, Connector, ConnectorData, ConnectorEvent,
    ConnectorFuture, JsonRpcConnector, JsonRpcSigner, MockConnector, RetryConfig, RpcClient,
    Signer, SignerFuture, Status,
};
pub use contract::{ContractInterface, SelectorInterface, function_selector};
pub use hooks::{
    AccountWatcher, KeyEnvironment, PrepareContractWrite, PrepareContractWriteKey,
    PrepareContractWriteResult, PreparePhase, PrepareWriteArgs, PreparedConfig, SettledOutcome,
    query_key, watch_account,
};
pub use query::{
    DEFAULT_CACHE_TIME, FetchStatus, MAX_RETRY, MAX_RETRY_DELAY, QueryClient, QueryKey,
    QueryOptions, QueryResult, QueryStatus, canonical_hash,
};

/// Glob-import for application code.
pub mod prelude {
    pub use crate::{
        Address, Client, ContractInterface, Error, Overrides, PrepareMode, PreparedConfig,
        QueryOptions, SelectorInterface, Signer, watch_account, write_contract,
    };
}
