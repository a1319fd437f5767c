//! Account addresses and ENS-style names.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::ParseAddressError;

/// A 20-byte account address.
///
/// Parses from `0x`-prefixed hex. All-lowercase and all-uppercase input is
/// accepted as-is; mixed-case input must carry a valid EIP-55 checksum.
/// Displays in checksummed form.
///
/// # Example
///
/// ```
/// use wallet_kit::Address;
///
/// let addr: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
/// assert_eq!(addr.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0; 20]);

    /// Create from raw 20 bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw 20 bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase hex form with `0x` prefix.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 checksummed hex form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAddressError::Empty);
        }
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseAddressError::MissingPrefix(s.to_string()))?;

        let bytes = hex::decode(digits).map_err(|e| ParseAddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(ParseAddressError::InvalidLength(bytes.len()));
        }

        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        let address = Self(arr);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(ParseAddressError::InvalidChecksum(s.to_string()));
        }

        Ok(address)
    }
}

impl TryFrom<&str> for Address {
    type Error = ParseAddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_lower_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// AddressOrName
// ============================================================================

/// Either a raw address or an ENS-style name such as `vitalik.eth`.
///
/// Strings starting with `0x` are parsed as addresses; anything else is
/// treated as a name and lowercased.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AddressOrName {
    Address(Address),
    Name(String),
}

impl AddressOrName {
    /// The address, if this is not a name.
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            AddressOrName::Address(address) => Some(address),
            AddressOrName::Name(_) => None,
        }
    }

    /// Whether this is an unresolved name.
    pub fn is_name(&self) -> bool {
        matches!(self, AddressOrName::Name(_))
    }
}

impl FromStr for AddressOrName {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAddressError::Empty);
        }
        if s.starts_with("0x") || s.starts_with("0X") {
            return s.parse().map(AddressOrName::Address);
        }
        let valid_name = s.contains('.')
            && !s.starts_with('.')
            && !s.ends_with('.')
            && !s.split('.').any(str::is_empty)
            && !s.chars().any(char::is_whitespace);
        if !valid_name {
            return Err(ParseAddressError::InvalidName(s.to_string()));
        }
        Ok(AddressOrName::Name(s.to_lowercase()))
    }
}

impl From<Address> for AddressOrName {
    fn from(address: Address) -> Self {
        AddressOrName::Address(address)
    }
}

impl Display for AddressOrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressOrName::Address(address) => Display::fmt(address, f),
            AddressOrName::Name(name) => f.write_str(name),
        }
    }
}

impl Debug for AddressOrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressOrName::Address(address) => Debug::fmt(address, f),
            AddressOrName::Name(name) => write!(f, "Name({})", name),
        }
    }
}

impl Serialize for AddressOrName {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            AddressOrName::Address(address) => address.serialize(s),
            AddressOrName::Name(name) => s.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for AddressOrName {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
