//! Chain identification and RPC presets.

use std::borrow::Cow;
use std::fmt;

/// An EVM chain the client can talk to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Chain {
    /// EIP-155 chain id.
    pub id: u64,
    /// Human-readable name.
    pub name: Cow<'static, str>,
    /// Default JSON-RPC endpoint.
    pub rpc_url: Cow<'static, str>,
}

/// Ethereum mainnet.
pub const MAINNET: Chain = Chain {
    id: 1,
    name: Cow::Borrowed("Ethereum"),
    rpc_url: Cow::Borrowed("https://cloudflare-eth.com"),
};

/// Sepolia testnet.
pub const SEPOLIA: Chain = Chain {
    id: 11_155_111,
    name: Cow::Borrowed("Sepolia"),
    rpc_url: Cow::Borrowed("https://rpc.sepolia.org"),
};

/// Holesky testnet.
pub const HOLESKY: Chain = Chain {
    id: 17_000,
    name: Cow::Borrowed("Holesky"),
    rpc_url: Cow::Borrowed("https://ethereum-holesky.publicnode.com"),
};

/// Local development node (anvil, hardhat).
pub const LOCALHOST: Chain = Chain {
    id: 31_337,
    name: Cow::Borrowed("Localhost"),
    rpc_url: Cow::Borrowed("http://127.0.0.1:8545"),
};

impl Chain {
    /// Create a custom chain.
    pub fn custom(id: u64, name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            id,
            name: Cow::Owned(name.into()),
            rpc_url: Cow::Owned(rpc_url.into()),
        }
    }

    /// Look up a preset by chain id.
    pub fn from_id(id: u64) -> Option<Chain> {
        [MAINNET, SEPOLIA, HOLESKY, LOCALHOST]
            .into_iter()
            .find(|chain| chain.id == id)
    }

    /// Returns true if this is Ethereum mainnet.
    pub fn is_mainnet(&self) -> bool {
        self.id == MAINNET.id
    }

    /// Returns true for the local development chain id.
    pub fn is_local(&self) -> bool {
        self.id == LOCALHOST.id
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
