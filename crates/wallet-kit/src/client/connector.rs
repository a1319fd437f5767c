//! Wallet connectors.
//!
//! A connector represents a wallet session: it connects, reports the
//! account and chain, and hands out signers. The [`Client`](super::Client)
//! drives it and records what it reports.
//!
//! | Connector | Use Case |
//! |-----------|----------|
//! | [`JsonRpcConnector`] | Unlocked accounts on a JSON-RPC node |
//! | [`MockConnector`] | Tests and scripts with a ready-made signer |

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ConnectorError;
use crate::types::Address;

use super::rpc::RpcClient;
use super::signer::{JsonRpcSigner, Signer};

/// Boxed future returned by [`Connector`] methods.
pub type ConnectorFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ConnectorError>> + Send + 'a>>;

/// Chain reported by a connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectedChain {
    pub id: u64,
    /// Set by the client when the id is not one of its configured chains.
    pub unsupported: bool,
}

/// What a connector reports about the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectorData {
    pub account: Option<Address>,
    pub chain: Option<ConnectedChain>,
}

/// Events a connector emits after connecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// Account and/or chain changed. `None` fields are unchanged.
    Change {
        account: Option<Address>,
        chain_id: Option<u64>,
    },
    /// The wallet ended the session.
    Disconnect,
    /// The wallet reported an error. The session stays as it was.
    Error(String),
}

/// Trait for wallet connectors.
pub trait Connector: Send + Sync {
    /// Stable identifier, e.g. `"jsonRpc"`.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Open a session, optionally asking for a specific chain.
    fn connect(&self, chain_id: Option<u64>) -> ConnectorFuture<'_, ConnectorData>;

    /// Close the session.
    fn disconnect(&self) -> ConnectorFuture<'_, ()>;

    /// Get a signer for the connected account.
    fn get_signer(&self, chain_id: Option<u64>) -> ConnectorFuture<'_, Arc<dyn Signer>>;
}

impl std::fmt::Debug for dyn Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

// ============================================================================
// JsonRpcConnector
// ============================================================================

/// Connector for accounts unlocked on a JSON-RPC node.
///
/// `connect` reads `eth_accounts` and `eth_chainId`; the account at
/// `account_index` (default 0) becomes the session account.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use wallet_kit::*;
///
/// # async fn example() -> Result<(), wallet_kit::Error> {
/// let client = Client::local().build()?;
/// let connector = JsonRpcConnector::new(Arc::new(RpcClient::new("http://127.0.0.1:8545")));
/// let data = client.connect(Arc::new(connector)).await?;
/// println!("Connected as {:?}", data.account);
/// # Ok(())
/// # }
/// ```
pub struct JsonRpcConnector {
    rpc: Arc<RpcClient>,
    account_index: usize,
    session: Mutex<Option<(Address, u64)>>,
}

impl JsonRpcConnector {
    /// Create a connector for the node behind `rpc`.
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            account_index: 0,
            session: Mutex::new(None),
        }
    }

    /// Use the account at `index` in `eth_accounts`.
    pub fn account_index(mut self, index: usize) -> Self {
        self.account_index = index;
        self
    }

    fn session(&self) -> Option<(Address, u64)> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for JsonRpcConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcConnector")
            .field("rpc", &self.rpc.url())
            .field("account_index", &self.account_index)
            .field("session", &self.session())
            .finish()
    }
}

impl Connector for JsonRpcConnector {
    fn id(&self) -> &str {
        "jsonRpc"
    }

    fn name(&self) -> &str {
        "JSON-RPC"
    }

    fn connect(&self, chain_id: Option<u64>) -> ConnectorFuture<'_, ConnectorData> {
        Box::pin(async move {
            let node_chain = self.rpc.chain_id().await?;
            if let Some(requested) = chain_id {
                if requested != node_chain {
                    return Err(ConnectorError::UnsupportedChain(requested));
                }
            }

            let accounts = self.rpc.accounts().await?;
            let account = *accounts
                .get(self.account_index)
                .ok_or(ConnectorError::NoAccounts)?;

            *self.session.lock().unwrap_or_else(PoisonError::into_inner) =
                Some((account, node_chain));

            Ok(ConnectorData {
                account: Some(account),
                chain: Some(ConnectedChain {
                    id: node_chain,
                    unsupported: false,
                }),
            })
        })
    }

    fn disconnect(&self) -> ConnectorFuture<'_, ()> {
        Box::pin(async move {
            *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
            Ok(())
        })
    }

    fn get_signer(&self, chain_id: Option<u64>) -> ConnectorFuture<'_, Arc<dyn Signer>> {
        Box::pin(async move {
            let (account, session_chain) = self.session().ok_or(ConnectorError::NotConnected)?;
            if let Some(requested) = chain_id {
                if requested != session_chain {
                    return Err(ConnectorError::UnsupportedChain(requested));
                }
            }
            let signer: Arc<dyn Signer> = Arc::new(JsonRpcSigner::new(account, self.rpc.clone()));
            Ok(signer)
        })
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Connector that wraps an existing signer.
///
/// Connects instantly to `chain_id` with the signer's address. Can be told
/// to fail the next connect, which is useful for exercising error paths.
pub struct MockConnector {
    signer: Arc<dyn Signer>,
    chain_id: u64,
    connected: AtomicBool,
    fail_connect: AtomicBool,
}

impl MockConnector {
    /// Create a connector for `signer` on `chain_id`.
    pub fn new(signer: Arc<dyn Signer>, chain_id: u64) -> Self {
        Self {
            signer,
            chain_id,
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
        }
    }

    /// Make the next `connect` fail with [`ConnectorError::UserRejected`].
    pub fn fail_next_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Whether a session is open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("address", self.signer.address())
            .field("chain_id", &self.chain_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Connector for MockConnector {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock"
    }

    fn connect(&self, _chain_id: Option<u64>) -> ConnectorFuture<'_, ConnectorData> {
        Box::pin(async move {
            if self.fail_connect.swap(false, Ordering::SeqCst) {
                return Err(ConnectorError::UserRejected);
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(ConnectorData {
                account: Some(*self.signer.address()),
                chain: Some(ConnectedChain {
                    id: self.chain_id,
                    unsupported: false,
                }),
            })
        })
    }

    fn disconnect(&self) -> ConnectorFuture<'_, ()> {
        Box::pin(async move {
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn get_signer(&self, _chain_id: Option<u64>) -> ConnectorFuture<'_, Arc<dyn Signer>> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(ConnectorError::NotConnected);
            }
            Ok(self.signer.clone())
        })
    }
}
