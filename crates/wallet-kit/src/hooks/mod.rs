//! Hooks: stateful reads that combine client state with the query cache.
//!
//! - [`watch_account`] — Follow account changes
//! - [`PrepareContractWrite`] — Prepare a contract write through the cache

mod account;
mod prepare_contract_write;

pub use account::{AccountWatcher, watch_account};
pub use prepare_contract_write::{
    KeyEnvironment, PREPARE_ENTITY, PrepareContractWrite, PrepareContractWriteKey,
    PrepareContractWriteResult, PreparePhase, PrepareWriteArgs, PreparedConfig, SettledOutcome,
    query_key,
};
