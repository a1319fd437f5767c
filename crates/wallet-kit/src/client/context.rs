//! The wallet client context.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::actions::{self, Account, EstimateGasPreparer, PrepareWrite};
use crate::contract::ContractInterface;
use crate::error::Error;
use crate::hooks::{PrepareContractWrite, PreparedConfig};
use crate::query::QueryClient;
use crate::types::{Chain, LOCALHOST, MAINNET, SEPOLIA, TxHash};

use super::connector::{ConnectedChain, Connector, ConnectorData, ConnectorEvent};
use super::rpc::{RetryConfig, RpcClient};
use super::signer::Signer;

/// Connection status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    Connected,
    Connecting,
    #[default]
    Disconnected,
}

/// Everything the client knows about the wallet session.
#[derive(Clone, Debug, Default)]
pub struct ClientState {
    pub status: Status,
    pub connector: Option<Arc<dyn Connector>>,
    pub data: Option<ConnectorData>,
}

struct ClientInner {
    chains: Vec<Chain>,
    default_chain_id: u64,
    providers: HashMap<u64, Arc<RpcClient>>,
    state: watch::Sender<ClientState>,
    query_client: QueryClient,
    preparer: Arc<dyn PrepareWrite>,
    connector: Option<Arc<dyn Connector>>,
}

/// The wallet client: session state, providers, and the query cache.
///
/// `Client` is the context every hook and action reads from. It is cheap to
/// clone; clones share state.
///
/// Its lifecycle is explicit: build it at startup, feed it connector
/// activity through [`connect`](Self::connect),
/// [`handle_event`](Self::handle_event) and
/// [`disconnect`](Self::disconnect), and call [`dispose`](Self::dispose) at
/// shutdown.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use wallet_kit::*;
///
/// # async fn example() -> Result<(), wallet_kit::Error> {
/// let client = Client::local().build()?;
/// let rpc = client.provider(client.chain_id()).unwrap();
/// client.connect(Arc::new(JsonRpcConnector::new(rpc))).await?;
///
/// let account = client.account();
/// println!("Connected as {:?}", account.address);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Builder with Ethereum mainnet.
    pub fn mainnet() -> ClientBuilder {
        ClientBuilder::new().chain(MAINNET)
    }

    /// Builder with the Sepolia testnet.
    pub fn sepolia() -> ClientBuilder {
        ClientBuilder::new().chain(SEPOLIA)
    }

    /// Builder with a local development node at `http://127.0.0.1:8545`.
    pub fn local() -> ClientBuilder {
        ClientBuilder::new().chain(LOCALHOST)
    }

    /// Empty builder. Falls back to mainnet if no chain is added.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from environment variables.
    ///
    /// - `WALLET_KIT_CHAIN_ID` (optional): default chain id. Defaults to
    ///   mainnet.
    /// - `WALLET_KIT_RPC_URL` (optional): RPC endpoint for that chain.
    ///   Required for chain ids without a preset.
    ///
    /// ```bash
    /// export WALLET_KIT_CHAIN_ID=31337
    /// export WALLET_KIT_RPC_URL=http://127.0.0.1:8545
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `WALLET_KIT_CHAIN_ID` is not a number
    /// - `WALLET_KIT_RPC_URL` is set without `WALLET_KIT_CHAIN_ID`
    /// - the chain id has no preset and no RPC URL is given
    pub fn from_env() -> Result<Client, Error> {
        let chain_id = std::env::var("WALLET_KIT_CHAIN_ID").ok();
        let rpc_url = std::env::var("WALLET_KIT_RPC_URL").ok();
        Self::from_vars(chain_id.as_deref(), rpc_url.as_deref())?.build()
    }

    fn from_vars(chain_id: Option<&str>, rpc_url: Option<&str>) -> Result<ClientBuilder, Error> {
        let chain_id = chain_id
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!("WALLET_KIT_CHAIN_ID must be a number, got '{}'", raw))
                })
            })
            .transpose()?;

        let chain = match (chain_id, rpc_url) {
            (None, None) => MAINNET,
            (None, Some(_)) => {
                return Err(Error::Config(
                    "WALLET_KIT_RPC_URL is set but WALLET_KIT_CHAIN_ID is missing".into(),
                ));
            }
            (Some(id), Some(url)) => match Chain::from_id(id) {
                Some(preset) => Chain::custom(id, preset.name, url),
                None => Chain::custom(id, format!("Chain {}", id), url),
            },
            (Some(id), None) => Chain::from_id(id).ok_or_else(|| {
                Error::Config(format!(
                    "No RPC preset for chain {}; set WALLET_KIT_RPC_URL",
                    id
                ))
            })?,
        };

        Ok(ClientBuilder::new().chain(chain))
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Snapshot of the session state.
    pub fn state(&self) -> ClientState {
        self.inner.state.borrow().clone()
    }

    /// Current connection status.
    pub fn status(&self) -> Status {
        self.inner.state.borrow().status
    }

    /// Watch state changes.
    ///
    /// The receiver sees every update made by `connect`, `disconnect`,
    /// `handle_event` and `dispose`.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.inner.state.subscribe()
    }

    /// The connected account, if any.
    pub fn account(&self) -> Account {
        actions::get_account(self)
    }

    /// The connected chain, else the default chain.
    pub fn chain_id(&self) -> u64 {
        self.inner
            .state
            .borrow()
            .data
            .as_ref()
            .and_then(|data| data.chain)
            .map(|chain| chain.id)
            .unwrap_or(self.inner.default_chain_id)
    }

    /// Configured chains, default chain first.
    pub fn chains(&self) -> &[Chain] {
        &self.inner.chains
    }

    /// RPC client for `chain_id`, if that chain is configured.
    pub fn provider(&self, chain_id: u64) -> Option<Arc<RpcClient>> {
        self.inner.providers.get(&chain_id).cloned()
    }

    /// The shared query cache.
    pub fn query_client(&self) -> &QueryClient {
        &self.inner.query_client
    }

    pub(crate) fn preparer(&self) -> Arc<dyn PrepareWrite> {
        self.inner.preparer.clone()
    }

    fn is_supported(&self, chain_id: u64) -> bool {
        self.inner.chains.iter().any(|chain| chain.id == chain_id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect through `connector`.
    ///
    /// A different connector that is already connected is disconnected
    /// first. On failure the client goes back to `Disconnected`.
    pub async fn connect(&self, connector: Arc<dyn Connector>) -> Result<ConnectorData, Error> {
        let previous = self.inner.state.borrow().connector.clone();
        if let Some(previous) = previous.filter(|p| !Arc::ptr_eq(p, &connector)) {
            tracing::debug!(connector = previous.id(), "replacing active connector");
            if let Err(e) = previous.disconnect().await {
                tracing::warn!(connector = previous.id(), error = %e, "connector failed to disconnect");
            }
        }

        tracing::debug!(connector = connector.id(), "connecting");
        self.inner.state.send_modify(|state| {
            state.status = Status::Connecting;
            state.connector = Some(connector.clone());
        });

        match connector.connect(None).await {
            Ok(mut data) => {
                if let Some(chain) = data.chain.as_mut() {
                    chain.unsupported = !self.is_supported(chain.id);
                }
                self.inner.state.send_modify(|state| {
                    state.status = Status::Connected;
                    state.connector = Some(connector.clone());
                    state.data = Some(data.clone());
                });
                tracing::debug!(
                    connector = connector.id(),
                    account = ?data.account,
                    chain = ?data.chain,
                    "connected"
                );
                Ok(data)
            }
            Err(e) => {
                tracing::debug!(connector = connector.id(), error = %e, "connect failed");
                self.inner.state.send_modify(|state| {
                    *state = ClientState::default();
                });
                Err(e.into())
            }
        }
    }

    /// Connect through the connector set with
    /// [`ClientBuilder::connector`].
    ///
    /// Returns `Ok(None)` when none was set.
    pub async fn auto_connect(&self) -> Result<Option<ConnectorData>, Error> {
        match self.inner.connector.clone() {
            Some(connector) => self.connect(connector).await.map(Some),
            None => Ok(None),
        }
    }

    /// Disconnect the active connector, if any.
    ///
    /// The session is cleared even if the connector fails to disconnect.
    pub async fn disconnect(&self) {
        let connector = self.inner.state.borrow().connector.clone();
        if let Some(connector) = connector {
            if let Err(e) = connector.disconnect().await {
                tracing::warn!(connector = connector.id(), error = %e, "connector failed to disconnect");
            }
        }
        self.reset();
        tracing::debug!("disconnected");
    }

    /// Apply an event reported by the active connector.
    pub fn handle_event(&self, event: ConnectorEvent) {
        match event {
            ConnectorEvent::Change { account, chain_id } => {
                let supported = chain_id.map(|id| self.is_supported(id));
                self.inner.state.send_if_modified(|state| {
                    let Some(data) = state.data.as_mut() else {
                        return false;
                    };
                    if let Some(account) = account {
                        data.account = Some(account);
                    }
                    if let (Some(id), Some(supported)) = (chain_id, supported) {
                        data.chain = Some(ConnectedChain {
                            id,
                            unsupported: !supported,
                        });
                    }
                    true
                });
                tracing::debug!(?account, ?chain_id, "connector changed");
            }
            ConnectorEvent::Disconnect => {
                self.reset();
                tracing::debug!("connector disconnected");
            }
            ConnectorEvent::Error(message) => {
                tracing::warn!(%message, "connector error");
            }
        }
    }

    /// Shut down: clear the query cache and forget the session.
    ///
    /// Does not call the connector; use [`disconnect`](Self::disconnect)
    /// first to end the wallet session.
    pub fn dispose(&self) {
        self.inner.query_client.clear();
        self.reset();
        tracing::debug!("client disposed");
    }

    fn reset(&self) {
        self.inner.state.send_modify(|state| {
            *state = ClientState::default();
        });
    }

    // ========================================================================
    // Signers and contracts
    // ========================================================================

    /// Ask the active connector for a signer on `chain_id`.
    ///
    /// Returns `Ok(None)` when no wallet is connected.
    pub async fn fetch_signer(&self, chain_id: Option<u64>) -> Result<Option<Arc<dyn Signer>>, Error> {
        let connector = self.inner.state.borrow().connector.clone();
        match connector {
            Some(connector) => Ok(Some(connector.get_signer(chain_id).await?)),
            None => Ok(None),
        }
    }

    /// Prepare a contract write.
    ///
    /// Returns a builder; `.await` it to run the preparation through the
    /// query cache.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use wallet_kit::*;
    ///
    /// # async fn example(client: Client) -> Result<(), wallet_kit::Error> {
    /// let pet = Arc::new(SelectorInterface::new().function("feed()"));
    /// let prepared = client
    ///     .prepare_contract_write("0xecb504d39723b0be0e3a9aa33d646642d1051ee1", pet, "feed")
    ///     .suspense(true)
    ///     .await?;
    ///
    /// if prepared.config.is_prepared() {
    ///     let hash = client.write_contract(&prepared.config).await?;
    ///     println!("Sent {}", hash);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn prepare_contract_write(
        &self,
        address_or_name: impl AsRef<str>,
        contract_interface: Arc<dyn ContractInterface>,
        function_name: impl Into<String>,
    ) -> PrepareContractWrite {
        PrepareContractWrite::new(
            self.clone(),
            address_or_name.as_ref().parse(),
            contract_interface,
            function_name.into(),
        )
    }

    /// Send a prepared write. See [`write_contract`](crate::write_contract).
    pub async fn write_contract(&self, config: &PreparedConfig) -> Result<TxHash, Error> {
        actions::write_contract(self, config).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("chains", &self.inner.chains)
            .field("default_chain_id", &self.inner.default_chain_id)
            .field("state", &*self.inner.state.borrow())
            .field("query_client", &self.inner.query_client)
            .finish()
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for [`Client`].
pub struct ClientBuilder {
    chains: Vec<Chain>,
    default_chain_id: Option<u64>,
    retry_config: RetryConfig,
    preparer: Option<Arc<dyn PrepareWrite>>,
    query_client: Option<QueryClient>,
    connector: Option<Arc<dyn Connector>>,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            chains: Vec::new(),
            default_chain_id: None,
            retry_config: RetryConfig::default(),
            preparer: None,
            query_client: None,
            connector: None,
        }
    }

    /// Add a chain. The first chain added is the default.
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Add several chains.
    pub fn chains(mut self, chains: impl IntoIterator<Item = Chain>) -> Self {
        self.chains.extend(chains);
        self
    }

    /// Pick the default chain by id. It must be one of the added chains.
    pub fn default_chain(mut self, chain_id: u64) -> Self {
        self.default_chain_id = Some(chain_id);
        self
    }

    /// Set the retry configuration for RPC calls.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Replace the default [`EstimateGasPreparer`].
    pub fn preparer(mut self, preparer: impl PrepareWrite + 'static) -> Self {
        self.preparer = Some(Arc::new(preparer));
        self
    }

    /// Connector used by [`Client::auto_connect`].
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Share an existing query cache.
    pub fn query_client(mut self, query_client: QueryClient) -> Self {
        self.query_client = Some(query_client);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a chain id is listed twice or the
    /// default chain is not among the chains.
    pub fn build(self) -> Result<Client, Error> {
        let mut chains = self.chains;
        if chains.is_empty() {
            chains.push(MAINNET);
        }

        let mut providers = HashMap::with_capacity(chains.len());
        for chain in &chains {
            let rpc = RpcClient::with_retry_config(chain.rpc_url.to_string(), self.retry_config.clone());
            if providers.insert(chain.id, Arc::new(rpc)).is_some() {
                return Err(Error::Config(format!("chain {} is configured twice", chain.id)));
            }
        }

        let default_chain_id = self.default_chain_id.unwrap_or(chains[0].id);
        let Some(position) = chains.iter().position(|c| c.id == default_chain_id) else {
            return Err(Error::Config(format!(
                "default chain {} is not among the configured chains",
                default_chain_id
            )));
        };
        chains.swap(0, position);

        let (state, _) = watch::channel(ClientState::default());

        Ok(Client {
            inner: Arc::new(ClientInner {
                chains,
                default_chain_id,
                providers,
                state,
                query_client: self.query_client.unwrap_or_default(),
                preparer: self.preparer.unwrap_or_else(|| Arc::new(EstimateGasPreparer)),
                connector: self.connector,
            }),
        })
    }
}
