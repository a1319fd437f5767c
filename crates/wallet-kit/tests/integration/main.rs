//! Integration tests for wallet-kit.
//!
//! Everything runs in-process: signers and preparers are mocks, and the
//! JSON-RPC tests talk to a small HTTP node bound to a local port.
//!
//! Run with: `cargo test --test integration`

mod account_integration;
mod common;
mod json_rpc_integration;
mod prepare_contract_write_integration;
mod write_contract_integration;
