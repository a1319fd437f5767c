//! Contract interfaces.
//!
//! wallet-kit does not encode ABI itself. A [`ContractInterface`] turns a
//! function name and JSON arguments into calldata; plug in whatever ABI
//! library you already use.
//!
//! ```rust,ignore
//! use wallet_kit::{Bytes, ContractInterface, Error};
//!
//! struct Erc20Abi(alloy_json_abi::JsonAbi);
//!
//! impl ContractInterface for Erc20Abi {
//!     fn encode_function_data(
//!         &self,
//!         function_name: &str,
//!         args: &[serde_json::Value],
//!     ) -> Result<Bytes, Error> {
//!         // look up `function_name`, coerce `args`, encode
//!     }
//! }
//! ```
//!
//! [`SelectorInterface`] covers the common case of calling functions that
//! take no arguments.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::error::Error;
use crate::types::Bytes;

/// Encodes calls to a contract's functions.
pub trait ContractInterface: Send + Sync {
    /// Calldata for `function_name(args...)`.
    fn encode_function_data(&self, function_name: &str, args: &[Value]) -> Result<Bytes, Error>;
}

impl fmt::Debug for dyn ContractInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContractInterface")
    }
}

/// The 4-byte selector of a canonical function signature.
///
/// ```
/// assert_eq!(
///     wallet_kit::function_selector("transfer(address,uint256)"),
///     [0xa9, 0x05, 0x9c, 0xbb]
/// );
/// ```
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Interface for functions without arguments.
///
/// Calldata is just the selector.
///
/// # Example
///
/// ```
/// use wallet_kit::{ContractInterface, SelectorInterface};
///
/// let pet = SelectorInterface::new().function("feed()");
/// let data = pet.encode_function_data("feed", &[]).unwrap();
/// assert_eq!(data.len(), 4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SelectorInterface {
    functions: HashMap<String, (String, [u8; 4])>,
}

impl SelectorInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function by canonical signature, e.g. `"feed()"`.
    pub fn function(mut self, signature: &str) -> Self {
        let name = signature.split('(').next().unwrap_or(signature).trim();
        self.functions.insert(
            name.to_string(),
            (signature.to_string(), function_selector(signature)),
        );
        self
    }
}

impl ContractInterface for SelectorInterface {
    fn encode_function_data(&self, function_name: &str, args: &[Value]) -> Result<Bytes, Error> {
        let (signature, selector) = self
            .functions
            .get(function_name)
            .ok_or_else(|| Error::encoding(function_name, "unknown function"))?;

        if !signature.ends_with("()") {
            return Err(Error::encoding(
                function_name,
                format!("{} takes arguments; use an ABI encoder", signature),
            ));
        }
        if !args.is_empty() {
            return Err(Error::encoding(
                function_name,
                format!("expected 0 arguments, got {}", args.len()),
            ));
        }
        Ok(Bytes::new(selector.to_vec()))
    }
}
