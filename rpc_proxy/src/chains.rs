//! Static chain table for the EVM networks GhostFlow supports

use serde::{Deserialize, Serialize};
use std::fmt;

/// Public Solana mainnet endpoint, always the last Solana candidate
pub const SOLANA_PUBLIC_RPC: &str = "https://solana-rpc.publicnode.com";

/// Proxy route paths, shared by the server and by clients in proxy mode
pub const EVM_RPC_PATH: &str = "/.netlify/functions/evm-rpc";
pub const SOLANA_RPC_PATH: &str = "/.netlify/functions/solana-rpc";

/// EVM chains with a dedicated upstream list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvmChain {
    Ethereum,
    Avalanche,
    Base,
    Polygon,
    Bsc,
    Arbitrum,
    Optimism,
}

impl EvmChain {
    pub const ALL: [EvmChain; 7] = [
        EvmChain::Ethereum,
        EvmChain::Avalanche,
        EvmChain::Base,
        EvmChain::Polygon,
        EvmChain::Bsc,
        EvmChain::Arbitrum,
        EvmChain::Optimism,
    ];

    pub fn from_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.id() == chain_id)
    }

    /// Look up a chain from the raw `chainId` query value
    pub fn from_query(raw: &str) -> Option<Self> {
        raw.trim().parse::<u64>().ok().and_then(Self::from_id)
    }

    pub fn id(self) -> u64 {
        match self {
            EvmChain::Ethereum => 1,
            EvmChain::Avalanche => 43114,
            EvmChain::Base => 8453,
            EvmChain::Polygon => 137,
            EvmChain::Bsc => 56,
            EvmChain::Arbitrum => 42161,
            EvmChain::Optimism => 10,
        }
    }

    /// Prefix of the `<PREFIX>_RPC_1` / `<PREFIX>_RPC_2` variables
    pub fn env_prefix(self) -> &'static str {
        match self {
            EvmChain::Ethereum => "ETH",
            EvmChain::Avalanche => "AVALANCHE",
            EvmChain::Base => "BASE",
            EvmChain::Polygon => "POLYGON",
            EvmChain::Bsc => "BSC",
            EvmChain::Arbitrum => "ARBITRUM",
            EvmChain::Optimism => "OPTIMISM",
        }
    }

    /// Server-side key variables, in priority order
    pub fn key_vars(self) -> [String; 2] {
        let prefix = self.env_prefix();
        [format!("{prefix}_RPC_1"), format!("{prefix}_RPC_2")]
    }

    pub fn public_rpc(self) -> &'static str {
        match self {
            EvmChain::Ethereum => "https://ethereum-rpc.publicnode.com",
            EvmChain::Avalanche => "https://avalanche-c-chain-rpc.publicnode.com",
            EvmChain::Base => "https://base-rpc.publicnode.com",
            EvmChain::Polygon => "https://polygon-rpc.com",
            EvmChain::Bsc => "https://bsc-dataseed.publicnode.com",
            EvmChain::Arbitrum => "https://arbitrum-one-rpc.publicnode.com",
            EvmChain::Optimism => "https://optimism-rpc.publicnode.com",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EvmChain::Ethereum => "Ethereum",
            EvmChain::Avalanche => "Avalanche",
            EvmChain::Base => "Base",
            EvmChain::Polygon => "Polygon",
            EvmChain::Bsc => "BSC",
            EvmChain::Arbitrum => "Arbitrum",
            EvmChain::Optimism => "Optimism",
        }
    }
}

impl fmt::Display for EvmChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}
