//! Core types for EVM wallets.
//!
//! Hand-rolled types shaped after Ethereum JSON-RPC, kept small enough that
//! the prepare cache key can serialize them canonically.

mod address;
mod chain;
pub(crate) mod primitives;
mod transaction;

pub use address::{Address, AddressOrName};
pub use chain::{Chain, HOLESKY, LOCALHOST, MAINNET, SEPOLIA};
pub use primitives::{Bytes, TxHash, parse_quantity};
pub use transaction::{Overrides, TransactionRequest};
