//! Transaction requests and per-call overrides.

use serde::{Deserialize, Serialize};

use super::{Address, Bytes};

/// Per-call transaction overrides.
///
/// Every field is optional. Unset fields are left for the node (or the
/// prepare step) to fill in. Part of the prepare cache key, so the
/// serialized form is stable: quantities are hex strings, unset fields are
/// omitted.
///
/// # Example
///
/// ```
/// use wallet_kit::Overrides;
///
/// let overrides = Overrides::default()
///     .value(1_000_000_000_000_000)
///     .gas_limit(120_000);
/// assert_eq!(overrides.gas_limit, Some(120_000));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub gas_limit: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub gas_price: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub max_fee_per_gas: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub max_priority_fee_per_gas: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub nonce: Option<u64>,

    /// Wei sent along with the call.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub value: Option<u128>,
}

impl Overrides {
    /// Send from a specific address.
    pub fn sender(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Fix the gas limit instead of estimating it.
    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }

    /// Set a legacy gas price in wei.
    pub fn gas_price(mut self, wei: u128) -> Self {
        self.gas_price = Some(wei);
        self
    }

    /// Set EIP-1559 fee caps in wei.
    pub fn fees(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    /// Set an explicit nonce.
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Attach a value in wei.
    pub fn value(mut self, wei: u128) -> Self {
        self.value = Some(wei);
        self
    }
}

/// A transaction request in Ethereum JSON-RPC shape.
///
/// This is what `eth_estimateGas` and `eth_sendTransaction` accept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub value: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub gas: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub gas_price: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub max_fee_per_gas: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub max_priority_fee_per_gas: Option<u128>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub nonce: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::primitives::quantity"
    )]
    pub chain_id: Option<u64>,
}

impl TransactionRequest {
    /// Start a request to `to` with calldata, applying `overrides`.
    ///
    /// `overrides.gas_limit` becomes `gas`; the other fields map one to one.
    pub fn call(to: Address, data: Bytes, overrides: &Overrides) -> Self {
        Self {
            from: overrides.from,
            to: Some(to),
            data: Some(data),
            value: overrides.value,
            gas: overrides.gas_limit,
            gas_price: overrides.gas_price,
            max_fee_per_gas: overrides.max_fee_per_gas,
            max_priority_fee_per_gas: overrides.max_priority_fee_per_gas,
            nonce: overrides.nonce,
            chain_id: None,
        }
    }
}
