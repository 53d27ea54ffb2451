use serde::{Deserialize, Serialize};

/// The EVM network a farm position lives on.
///
/// In JSON: `{"name": "base", "chain_id": 8453, "rpc_url": "https://mainnet.base.org"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chain {
    /// Human-readable chain name (e.g. "base", "ethereum").
    pub name: String,
    /// EVM chain ID.
    pub chain_id: u64,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
}

impl Chain {
    pub fn base() -> Self {
        Self::custom("base", 8453, "https://mainnet.base.org")
    }

    pub fn ethereum() -> Self {
        Self::custom("ethereum", 1, "https://eth.llamarpc.com")
    }

    pub fn arbitrum() -> Self {
        Self::custom("arbitrum", 42161, "https://arb1.arbitrum.io/rpc")
    }

    pub fn optimism() -> Self {
        Self::custom("optimism", 10, "https://mainnet.optimism.io")
    }

    /// Known chain by name. Unknown names yield `None`; use [`Chain::custom`] for those.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "base" => Some(Self::base()),
            "ethereum" | "mainnet" => Some(Self::ethereum()),
            "arbitrum" => Some(Self::arbitrum()),
            "optimism" => Some(Self::optimism()),
            _ => None,
        }
    }

    pub fn custom(name: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Chain {
            name: name.into(),
            chain_id,
            rpc_url: rpc_url.into(),
        }
    }

    /// Same chain, different endpoint (private RPC, local fork).
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}
