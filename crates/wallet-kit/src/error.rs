//! Error types for wallet-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) — Main error type, returned by most operations
//!   - [`RpcError`] — JSON-RPC transport and node errors
//!   - [`ConnectorError`] — Wallet connector failures
//!   - [`ParseAddressError`] — Invalid address or name format
//!
//! Errors produced by a prepare-call are not re-wrapped by the hooks. They
//! are stored in the query cache as `Arc<Error>` and surface through
//! [`QueryResult::error`](crate::QueryResult::error).
//!
//! # Example
//!
//! ```rust,no_run
//! use wallet_kit::*;
//!
//! # async fn example(client: &Client, config: &PreparedConfig) -> Result<(), Error> {
//! match client.write_contract(config).await {
//!     Ok(hash) => println!("Sent {}", hash),
//!     Err(Error::NotPrepared) => println!("Still preparing, try again"),
//!     Err(Error::Rpc(e)) if e.is_retryable() => println!("Node hiccup: {}", e),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Error parsing an address or an address-or-name value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address '{0}' is missing the 0x prefix")]
    MissingPrefix(String),

    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),

    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Address '{0}' has an invalid EIP-55 checksum")]
    InvalidChecksum(String),

    #[error("Name '{0}' is not a valid ENS-style name")]
    InvalidName(String),
}

/// Error from a wallet connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Connector is not connected")]
    NotConnected,

    #[error("Connector has no accounts available")]
    NoAccounts,

    #[error("User rejected the request")]
    UserRejected,

    #[error("Chain {0} is not supported by this connector")]
    UnsupportedChain(u64),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("{0}")]
    Other(String),
}

// ============================================================================
// RPC Errors
// ============================================================================

/// JSON-RPC specific errors.
#[derive(Debug, Error)]
pub enum RpcError {
    // ─── Network/Transport ───
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ─── Node errors ───
    #[error("RPC error: {message} (code: {code})")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Execution reverted: {message}")]
    ExecutionReverted {
        message: String,
        /// Hex-encoded revert data, if the node returned any.
        data: Option<String>,
    },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

impl RpcError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Http(e) => e.is_timeout() || e.is_connect(),
            RpcError::Network { retryable, .. } => *retryable,
            RpcError::RateLimited(_) => true,
            RpcError::Json(_)
            | RpcError::InvalidResponse(_)
            | RpcError::Rpc { .. }
            | RpcError::ExecutionReverted { .. }
            | RpcError::InsufficientFunds(_) => false,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>, status_code: Option<u16>, retryable: bool) -> Self {
        RpcError::Network {
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Whether the node reported a contract revert.
    pub fn is_revert(&self) -> bool {
        matches!(self, RpcError::ExecutionReverted { .. })
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for wallet-kit operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Configuration ───
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ─── Connection state ───
    #[error("No wallet connected. Call .connect() on the Client first.")]
    NotConnected,

    #[error("No signer available for this operation")]
    NoSigner,

    #[error("Chain mismatch: request targets chain {expected} but the signer is on chain {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    // ─── Contract writes ───
    #[error("Contract write is not prepared. Wait for the prepare query to succeed.")]
    NotPrepared,

    #[error("Could not resolve name '{0}' to an address")]
    UnresolvedName(String),

    #[error("Failed to encode call to '{function_name}': {message}")]
    Encoding {
        function_name: String,
        message: String,
    },

    // ─── Parsing ───
    #[error(transparent)]
    ParseAddress(#[from] ParseAddressError),

    // ─── Collaborators ───
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    // ─── Serialization ───
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an encoding error for a contract function.
    pub fn encoding(function_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Encoding {
            function_name: function_name.into(),
            message: message.into(),
        }
    }
}
