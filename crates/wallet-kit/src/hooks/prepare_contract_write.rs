//! Prepared contract writes, cached by structured key.
//!
//! [`PrepareContractWrite`] runs in a fixed sequence:
//!
//! ```text
//! Idle -> ResolvingSigner -> KeyDerived -> Fetching -> Settled(Success | Error)
//!                                      \-> Disabled
//! ```
//!
//! 1. **ResolvingSigner**: ask the client for a signer on the call's chain
//!    (or the active chain). A failure here is logged and treated as "no
//!    signer".
//! 2. **KeyDerived**: build the [`PrepareContractWriteKey`] from the call
//!    parameters plus the active chain id and signer address.
//! 3. **Fetching**: only when enabled *and* a signer exists. The query cache
//!    decides whether to run the prepare-call, join one already running, or
//!    serve cached data. Otherwise the sequence stops at **Disabled**.
//! 4. **Settled**: the prepare-call finished. Its error, if any, is the
//!    query's error; nothing is re-wrapped.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::actions::{PrepareFuture, PrepareMode, PrepareWrite, PrepareWriteContractConfig, PreparedWrite};
use crate::client::{Client, Signer};
use crate::contract::ContractInterface;
use crate::error::{Error, ParseAddressError};
use crate::query::{QueryKey, QueryOptions, QueryResult, QueryStatus};
use crate::types::{Address, AddressOrName, Overrides, TransactionRequest};

/// Entity tag of prepare keys.
pub const PREPARE_ENTITY: &str = "prepareContractTransaction";

// ============================================================================
// Keys
// ============================================================================

/// Call parameters of a prepared write.
#[derive(Clone, Debug)]
pub struct PrepareWriteArgs {
    pub address_or_name: AddressOrName,
    pub chain_id: Option<u64>,
    pub function_name: String,
    pub args: Vec<Value>,
    pub overrides: Option<Overrides>,
    /// Not part of the cache key.
    pub contract_interface: Arc<dyn ContractInterface>,
}

/// Client-derived inputs to the cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEnvironment {
    pub active_chain_id: u64,
    pub signer_address: Option<Address>,
}

/// Cache key of a prepared write.
///
/// Equal parameters and environment give equal keys, whatever the member
/// order inside `args`. A different signer address gives a different key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareContractWriteKey {
    pub entity: &'static str,
    pub active_chain_id: u64,
    pub address_or_name: AddressOrName,
    pub args: Vec<Value>,
    pub chain_id: Option<u64>,
    pub function_name: String,
    pub overrides: Option<Overrides>,
    pub signer_address: Option<Address>,
}

impl QueryKey for PrepareContractWriteKey {
    fn entity(&self) -> &str {
        self.entity
    }
}

/// Derive the cache key for `args` under `env`.
pub fn query_key(args: &PrepareWriteArgs, env: KeyEnvironment) -> PrepareContractWriteKey {
    PrepareContractWriteKey {
        entity: PREPARE_ENTITY,
        active_chain_id: env.active_chain_id,
        address_or_name: args.address_or_name.clone(),
        args: args.args.clone(),
        chain_id: args.chain_id,
        function_name: args.function_name.clone(),
        overrides: args.overrides.clone(),
        signer_address: env.signer_address,
    }
}

/// Fetcher that runs the prepare-call with the key's parameters.
fn prepare_fetcher(
    key: &PrepareContractWriteKey,
    contract_interface: Arc<dyn ContractInterface>,
    signer: Option<Arc<dyn Signer>>,
    preparer: Arc<dyn PrepareWrite>,
) -> impl Fn() -> PrepareFuture<'static> + Send + Sync + 'static {
    let config = PrepareWriteContractConfig {
        address_or_name: key.address_or_name.clone(),
        chain_id: key.chain_id,
        function_name: key.function_name.clone(),
        args: key.args.clone(),
        overrides: key.overrides.clone(),
        contract_interface,
        signer,
    };
    move || -> PrepareFuture<'static> {
        let preparer = preparer.clone();
        let config = config.clone();
        Box::pin(async move { preparer.prepare_write_contract(config).await })
    }
}

// ============================================================================
// Results
// ============================================================================

/// How a fetch ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettledOutcome {
    Success,
    Error,
}

/// Where a [`PrepareContractWrite`] got to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreparePhase {
    #[default]
    Idle,
    ResolvingSigner,
    KeyDerived,
    /// The prepare-call is running (or was joined and is still running).
    Fetching,
    /// Not enabled, or no signer.
    Disabled,
    Settled(SettledOutcome),
}

impl PreparePhase {
    /// Whether `next` may directly follow `self`.
    pub fn can_advance_to(self, next: PreparePhase) -> bool {
        use PreparePhase::*;
        matches!(
            (self, next),
            (Idle, ResolvingSigner)
                | (ResolvingSigner, KeyDerived)
                | (KeyDerived, Fetching)
                | (KeyDerived, Disabled)
                | (Fetching, Settled(_))
        )
    }

    fn advance(&mut self, next: PreparePhase) {
        debug_assert!(
            self.can_advance_to(next),
            "invalid prepare phase transition {:?} -> {:?}",
            self,
            next
        );
        tracing::trace!(from = ?self, to = ?next, "prepare phase");
        *self = next;
    }
}

/// Call parameters merged with the latest prepared data.
///
/// This is what [`Client::write_contract`] consumes. `mode` is
/// [`PrepareMode::Prepared`] only when the prepare-call has succeeded;
/// until then `request` is `None` and `mode` is
/// [`PrepareMode::Disabled`].
#[derive(Clone, Debug)]
pub struct PreparedConfig {
    pub address_or_name: AddressOrName,
    pub args: Vec<Value>,
    pub chain_id: Option<u64>,
    pub contract_interface: Arc<dyn ContractInterface>,
    pub function_name: String,
    pub overrides: Option<Overrides>,
    pub request: Option<TransactionRequest>,
    pub mode: PrepareMode,
}

impl PreparedConfig {
    fn merge(args: &PrepareWriteArgs, data: Option<&PreparedWrite>) -> Self {
        let mut config = Self {
            address_or_name: args.address_or_name.clone(),
            args: args.args.clone(),
            chain_id: args.chain_id,
            contract_interface: args.contract_interface.clone(),
            function_name: args.function_name.clone(),
            overrides: args.overrides.clone(),
            request: None,
            mode: PrepareMode::Disabled,
        };
        if let Some(data) = data {
            config.address_or_name = data.address_or_name.clone();
            config.args = data.args.clone();
            config.chain_id = data.chain_id;
            config.function_name = data.function_name.clone();
            config.overrides = data.overrides.clone();
            config.request = Some(data.request.clone());
            config.mode = data.mode;
        }
        config
    }

    /// Whether the config can be sent.
    pub fn is_prepared(&self) -> bool {
        self.mode == PrepareMode::Prepared && self.request.is_some()
    }
}

/// Query result plus the merged [`PreparedConfig`].
///
/// Derefs to the [`QueryResult`].
#[derive(Clone, Debug)]
pub struct PrepareContractWriteResult {
    pub query: QueryResult<PreparedWrite>,
    pub config: PreparedConfig,
    pub phase: PreparePhase,
}

impl Deref for PrepareContractWriteResult {
    type Target = QueryResult<PreparedWrite>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}

// ============================================================================
// PrepareContractWrite
// ============================================================================

/// Builder for a prepared contract write.
///
/// Created by [`Client::prepare_contract_write`]. Await it to run.
///
/// Awaiting fails only for invalid configuration: options that do not
/// validate, an empty function name, or an unparseable address. Failures of
/// the prepare-call itself are reported in [`QueryResult::error`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use wallet_kit::*;
///
/// # async fn example(client: Client, pet: Arc<dyn ContractInterface>) -> Result<(), Error> {
/// let prepared = client
///     .prepare_contract_write("0xecb504d39723b0be0e3a9aa33d646642d1051ee1", pet, "feed")
///     .overrides(Overrides::default().value(1_000))
///     .stale_time(Duration::from_secs(30))
///     .on_error(|e| eprintln!("prepare failed: {}", e))
///     .suspense(true)
///     .await?;
///
/// match prepared.phase {
///     PreparePhase::Settled(SettledOutcome::Success) => println!("{:?}", prepared.config.request),
///     PreparePhase::Disabled => println!("connect a wallet first"),
///     other => println!("{:?}", other),
/// }
/// # Ok(())
/// # }
/// ```
pub struct PrepareContractWrite {
    client: Client,
    address_or_name: Result<AddressOrName, ParseAddressError>,
    contract_interface: Arc<dyn ContractInterface>,
    function_name: String,
    chain_id: Option<u64>,
    args: Vec<Value>,
    overrides: Option<Overrides>,
    options: QueryOptions<PreparedWrite>,
    force: bool,
}

impl PrepareContractWrite {
    pub(crate) fn new(
        client: Client,
        address_or_name: Result<AddressOrName, ParseAddressError>,
        contract_interface: Arc<dyn ContractInterface>,
        function_name: String,
    ) -> Self {
        Self {
            client,
            address_or_name,
            contract_interface,
            function_name,
            chain_id: None,
            args: Vec::new(),
            overrides: None,
            options: QueryOptions::default(),
            force: false,
        }
    }

    /// Set all call arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Append one call argument.
    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Target a specific chain instead of the active one.
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Transaction overrides passed to the prepare-call.
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Replace every query option at once.
    pub fn options(mut self, options: QueryOptions<PreparedWrite>) -> Self {
        self.options = options;
        self
    }

    /// Allow or forbid the prepare-call.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.options.enabled = enabled;
        self
    }

    /// Keep the cached result this long after its last use.
    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.options.cache_time = cache_time;
        self
    }

    /// Reuse a cached result younger than this.
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.options.stale_time = stale_time;
        self
    }

    /// Wait for the prepare-call to settle before returning.
    pub fn suspense(mut self, suspense: bool) -> Self {
        self.options.suspense = suspense;
        self
    }

    /// Retry a failed prepare-call up to this many times.
    pub fn retry(mut self, retry: u32) -> Self {
        self.options.retry = retry;
        self
    }

    /// Run `f` with each successful preparation.
    pub fn on_success(mut self, f: impl Fn(&PreparedWrite) + Send + Sync + 'static) -> Self {
        self.options = self.options.on_success(f);
        self
    }

    /// Run `f` with each failed preparation.
    pub fn on_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.options = self.options.on_error(f);
        self
    }

    /// Run `f` after each preparation, whatever the outcome.
    pub fn on_settled(
        mut self,
        f: impl Fn(Option<&PreparedWrite>, Option<&Error>) + Send + Sync + 'static,
    ) -> Self {
        self.options = self.options.on_settled(f);
        self
    }

    /// Prepare again even if cached data is fresh.
    pub fn refetch(mut self) -> Self {
        self.force = true;
        self
    }
}

impl fmt::Debug for PrepareContractWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareContractWrite")
            .field("address_or_name", &self.address_or_name)
            .field("function_name", &self.function_name)
            .field("chain_id", &self.chain_id)
            .field("args", &self.args)
            .field("overrides", &self.overrides)
            .field("options", &self.options)
            .field("force", &self.force)
            .finish()
    }
}

impl IntoFuture for PrepareContractWrite {
    type Output = Result<PrepareContractWriteResult, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let mut phase = PreparePhase::Idle;

            self.options.validate()?;
            if self.function_name.trim().is_empty() {
                return Err(Error::Config("function name must not be empty".to_string()));
            }
            let args = PrepareWriteArgs {
                address_or_name: self.address_or_name?,
                chain_id: self.chain_id,
                function_name: self.function_name,
                args: self.args,
                overrides: self.overrides,
                contract_interface: self.contract_interface,
            };

            phase.advance(PreparePhase::ResolvingSigner);
            let active_chain_id = self.client.chain_id();
            let signer_chain_id = args.chain_id.unwrap_or(active_chain_id);
            let signer = match self.client.fetch_signer(Some(signer_chain_id)).await {
                Ok(signer) => signer,
                Err(e) => {
                    tracing::warn!(chain_id = signer_chain_id, error = %e, "could not resolve signer");
                    None
                }
            };

            let key = query_key(
                &args,
                KeyEnvironment {
                    active_chain_id,
                    signer_address: signer.as_ref().map(|s| *s.address()),
                },
            );
            phase.advance(PreparePhase::KeyDerived);

            let enabled = self.options.enabled && signer.is_some();
            let options = self.options.enabled(enabled);
            let fetcher = prepare_fetcher(
                &key,
                args.contract_interface.clone(),
                signer,
                self.client.preparer(),
            );

            phase.advance(if enabled {
                PreparePhase::Fetching
            } else {
                PreparePhase::Disabled
            });

            let queries = self.client.query_client();
            let query = if self.force {
                queries.refetch(&key, fetcher, options).await?
            } else {
                queries.fetch(&key, fetcher, options).await?
            };

            if enabled && !query.is_fetching() {
                match query.status {
                    QueryStatus::Success => phase.advance(PreparePhase::Settled(SettledOutcome::Success)),
                    QueryStatus::Error => phase.advance(PreparePhase::Settled(SettledOutcome::Error)),
                    QueryStatus::Idle | QueryStatus::Loading => {}
                }
            }

            let config = PreparedConfig::merge(&args, query.data.as_ref());
            Ok(PrepareContractWriteResult {
                query,
                config,
                phase,
            })
        })
    }
}
