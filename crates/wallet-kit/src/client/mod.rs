//! Client module for wallet sessions.
//!
//! This module provides the core client infrastructure:
//!
//! - [`Client`] — The client context, the single entry point for hooks and actions
//! - [`ClientBuilder`] — Fluent builder for configuring the client
//! - [`RpcClient`] — Low-level JSON-RPC client with retry logic
//!
//! # Connectors
//!
//! Connectors open wallet sessions and hand out signers:
//!
//! | Connector | Use Case |
//! |-----------|----------|
//! | [`JsonRpcConnector`] | Unlocked accounts on a development node |
//! | [`MockConnector`] | Tests and scripts with a ready-made signer |
//!
//! # Signers
//!
//! - [`JsonRpcSigner`] — Node-side signing through `eth_sendTransaction`

mod connector;
mod context;
mod rpc;
mod signer;

pub use connector::{
    ConnectedChain, Connector, ConnectorData, ConnectorEvent, ConnectorFuture, JsonRpcConnector,
    MockConnector,
};
pub use context::{Client, ClientBuilder, ClientState, Status};
pub use rpc::{RetryConfig, RpcClient};
pub use signer::{JsonRpcSigner, Signer, SignerFuture};
