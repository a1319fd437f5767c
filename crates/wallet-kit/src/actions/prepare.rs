//! Contract write preparation.
//!
//! Preparing a write resolves the target, encodes calldata, and estimates
//! gas without sending anything. The result can be handed to
//! [`write_contract`](super::write_contract) unchanged.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Signer;
use crate::contract::ContractInterface;
use crate::error::Error;
use crate::types::{AddressOrName, Overrides, TransactionRequest};

/// Boxed future returned by [`PrepareWrite`].
pub type PrepareFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PreparedWrite, Error>> + Send + 'a>>;

/// Input to a prepare-call.
#[derive(Clone)]
pub struct PrepareWriteContractConfig {
    pub address_or_name: AddressOrName,
    pub chain_id: Option<u64>,
    pub function_name: String,
    pub args: Vec<Value>,
    pub overrides: Option<Overrides>,
    pub contract_interface: Arc<dyn ContractInterface>,
    pub signer: Option<Arc<dyn Signer>>,
}

impl fmt::Debug for PrepareWriteContractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareWriteContractConfig")
            .field("address_or_name", &self.address_or_name)
            .field("chain_id", &self.chain_id)
            .field("function_name", &self.function_name)
            .field("args", &self.args)
            .field("overrides", &self.overrides)
            .field("signer", &self.signer.as_ref().map(|s| *s.address()))
            .finish()
    }
}

/// Whether a config is ready to send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrepareMode {
    /// A request was built and estimated.
    Prepared,
    /// Nothing was prepared (disabled, pending, or failed).
    #[default]
    Disabled,
}

/// Output of a prepare-call: the request plus the inputs it was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedWrite {
    pub address_or_name: AddressOrName,
    pub chain_id: Option<u64>,
    pub function_name: String,
    pub args: Vec<Value>,
    pub overrides: Option<Overrides>,
    pub request: TransactionRequest,
    pub mode: PrepareMode,
}

/// Something that can prepare contract writes.
///
/// The client uses [`EstimateGasPreparer`] unless another one is set with
/// [`ClientBuilder::preparer`](crate::ClientBuilder::preparer).
pub trait PrepareWrite: Send + Sync {
    fn prepare_write_contract(&self, config: PrepareWriteContractConfig) -> PrepareFuture<'_>;
}

/// Shared preparers can be handed to the client while the caller keeps a
/// handle.
impl<T: PrepareWrite + ?Sized> PrepareWrite for Arc<T> {
    fn prepare_write_contract(&self, config: PrepareWriteContractConfig) -> PrepareFuture<'_> {
        (**self).prepare_write_contract(config)
    }
}

/// Default preparer.
///
/// 1. Requires a signer ([`Error::NoSigner`]).
/// 2. Requires a literal address; names fail with [`Error::UnresolvedName`].
/// 3. Encodes calldata through the contract interface.
/// 4. Builds the request from the overrides, sent from the signer unless
///    `overrides.from` says otherwise.
/// 5. Fills `gas` with [`Signer::estimate_gas`] unless `gas_limit` is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct EstimateGasPreparer;

impl PrepareWrite for EstimateGasPreparer {
    fn prepare_write_contract(&self, config: PrepareWriteContractConfig) -> PrepareFuture<'_> {
        Box::pin(async move {
            let signer = config.signer.ok_or(Error::NoSigner)?;
            let to = match &config.address_or_name {
                AddressOrName::Address(address) => *address,
                AddressOrName::Name(name) => return Err(Error::UnresolvedName(name.clone())),
            };

            let data = config
                .contract_interface
                .encode_function_data(&config.function_name, &config.args)?;

            let overrides = config.overrides.clone().unwrap_or_default();
            let mut request = TransactionRequest::call(to, data, &overrides);
            request.from.get_or_insert(*signer.address());
            request.chain_id = config.chain_id;

            if request.gas.is_none() {
                let gas = signer.estimate_gas(&request).await?;
                tracing::debug!(%to, function = %config.function_name, gas, "estimated gas");
                request.gas = Some(gas);
            }

            Ok(PreparedWrite {
                address_or_name: config.address_or_name,
                chain_id: config.chain_id,
                function_name: config.function_name,
                args: config.args,
                overrides: config.overrides,
                request,
                mode: PrepareMode::Prepared,
            })
        })
    }
}
