//! Actions: plain async functions over a [`Client`](crate::Client).
//!
//! - [`get_account`] — Current account and connector
//! - [`PrepareWrite`] / [`EstimateGasPreparer`] — Build and estimate a write
//! - [`write_contract`] — Send a prepared write

mod account;
mod prepare;
mod write;

pub use account::{Account, get_account};
pub use prepare::{
    EstimateGasPreparer, PrepareFuture, PrepareMode, PrepareWrite, PrepareWriteContractConfig,
    PreparedWrite,
};
pub use write::write_contract;
