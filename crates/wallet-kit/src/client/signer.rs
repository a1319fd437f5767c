//! Signer trait and the JSON-RPC signer.
//!
//! A `Signer` knows which address it acts for and can estimate and submit
//! transactions. Key management lives behind the signer (in the node or the
//! wallet); wallet-kit never touches private keys.
//!
//! # Implementations
//!
//! - [`JsonRpcSigner`] - An account unlocked on a JSON-RPC node
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! use wallet_kit::{Address, Signer, SignerFuture, TransactionRequest, TxHash};
//!
//! struct HardwareSigner {
//!     address: Address,
//!     // ...
//! }
//!
//! impl Signer for HardwareSigner {
//!     fn address(&self) -> &Address {
//!         &self.address
//!     }
//!
//!     fn chain_id(&self) -> SignerFuture<'_, u64> {
//!         Box::pin(async { Ok(1) })
//!     }
//!
//!     fn estimate_gas(&self, tx: &TransactionRequest) -> SignerFuture<'_, u64> {
//!         // ...
//!     }
//!
//!     fn send_transaction(&self, tx: TransactionRequest) -> SignerFuture<'_, TxHash> {
//!         // ...
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::types::{Address, TransactionRequest, TxHash};

use super::rpc::RpcClient;

/// Boxed future returned by [`Signer`] methods.
pub type SignerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

// ============================================================================
// Signer Trait
// ============================================================================

/// Trait for authorizing transactions on behalf of an address.
pub trait Signer: Send + Sync {
    /// The address this signer acts for.
    fn address(&self) -> &Address;

    /// The chain the signer is currently on.
    fn chain_id(&self) -> SignerFuture<'_, u64>;

    /// Estimate gas for a request sent from this signer.
    fn estimate_gas(&self, tx: &TransactionRequest) -> SignerFuture<'_, u64>;

    /// Authorize and submit a transaction.
    fn send_transaction(&self, tx: TransactionRequest) -> SignerFuture<'_, TxHash>;
}

/// Implement `Signer` for `Arc<dyn Signer>` for convenience.
impl Signer for Arc<dyn Signer> {
    fn address(&self) -> &Address {
        (**self).address()
    }

    fn chain_id(&self) -> SignerFuture<'_, u64> {
        (**self).chain_id()
    }

    fn estimate_gas(&self, tx: &TransactionRequest) -> SignerFuture<'_, u64> {
        (**self).estimate_gas(tx)
    }

    fn send_transaction(&self, tx: TransactionRequest) -> SignerFuture<'_, TxHash> {
        (**self).send_transaction(tx)
    }
}

// ============================================================================
// JsonRpcSigner
// ============================================================================

/// A signer backed by an unlocked account on a JSON-RPC node.
///
/// Signing happens on the node through `eth_sendTransaction`. Suitable for
/// local development nodes (anvil, hardhat) and custodial endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use wallet_kit::{JsonRpcSigner, RpcClient};
///
/// let rpc = Arc::new(RpcClient::new("http://127.0.0.1:8545"));
/// let signer = JsonRpcSigner::new(
///     "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap(),
///     rpc,
/// );
/// ```
#[derive(Clone)]
pub struct JsonRpcSigner {
    address: Address,
    rpc: Arc<RpcClient>,
}

impl JsonRpcSigner {
    /// Create a signer for `address` on the node behind `rpc`.
    pub fn new(address: Address, rpc: Arc<RpcClient>) -> Self {
        Self { address, rpc }
    }

    /// The underlying RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    fn with_from(&self, tx: &TransactionRequest) -> TransactionRequest {
        let mut tx = tx.clone();
        tx.from.get_or_insert(self.address);
        tx
    }
}

impl std::fmt::Debug for JsonRpcSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcSigner")
            .field("address", &self.address)
            .field("rpc", &self.rpc.url())
            .finish()
    }
}

impl Signer for JsonRpcSigner {
    fn address(&self) -> &Address {
        &self.address
    }

    fn chain_id(&self) -> SignerFuture<'_, u64> {
        Box::pin(async move { Ok(self.rpc.chain_id().await?) })
    }

    fn estimate_gas(&self, tx: &TransactionRequest) -> SignerFuture<'_, u64> {
        let tx = self.with_from(tx);
        Box::pin(async move { Ok(self.rpc.estimate_gas(&tx).await?) })
    }

    fn send_transaction(&self, tx: TransactionRequest) -> SignerFuture<'_, TxHash> {
        let tx = self.with_from(&tx);
        Box::pin(async move {
            let hash = self.rpc.send_transaction(&tx).await?;
            tracing::debug!(from = %self.address, %hash, "transaction submitted");
            Ok(hash)
        })
    }
}
