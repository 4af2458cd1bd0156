//! CAIP-2 / CAIP-10 / CAIP-19 identifiers and the supported USDC set
//!
//! The swap SDK names assets and accounts with chain-agnostic ids; this module
//! parses them and maps each chain to the proxy route its RPC traffic takes.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::chains::EvmChain;

pub const EIP155_NAMESPACE: &str = "eip155";
pub const SOLANA_NAMESPACE: &str = "solana";
/// Genesis-hash prefix identifying Solana mainnet
pub const SOLANA_MAINNET_REFERENCE: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

pub const SUPPORTED_USDC: [&str; 8] = [
    "eip155:1/erc20:0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
    "eip155:43114/erc20:0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E",
    "eip155:8453/erc20:0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    "eip155:42161/erc20:0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
    "eip155:10/erc20:0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",
    "eip155:56/erc20:0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d",
    "eip155:137/erc20:0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359",
    "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp/token:EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
];

/// USDC on Avalanche
pub const DEFAULT_SOURCE: &str = SUPPORTED_USDC[1];
/// USDC on Ethereum
pub const DEFAULT_DEST: &str = SUPPORTED_USDC[0];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaipError {
    #[error("malformed CAIP-2 chain id '{0}'")]
    Chain(String),

    #[error("malformed CAIP-10 account id '{0}'")]
    Account(String),

    #[error("malformed CAIP-19 asset id '{0}'")]
    Asset(String),
}

/// Where a chain's RPC traffic is proxied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcRoute {
    Evm(EvmChain),
    Solana,
}

fn valid_namespace(s: &str) -> bool {
    (3..=8).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn valid_reference(s: &str, max: usize, extra: &[u8]) -> bool {
    (1..=max).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || extra.contains(&b))
}

/// CAIP-2 `<namespace>:<reference>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    pub namespace: String,
    pub reference: String,
}

impl ChainId {
    pub fn rpc_route(&self) -> Option<RpcRoute> {
        match self.namespace.as_str() {
            EIP155_NAMESPACE => EvmChain::from_query(&self.reference).map(RpcRoute::Evm),
            SOLANA_NAMESPACE if self.reference == SOLANA_MAINNET_REFERENCE => Some(RpcRoute::Solana),
            _ => None,
        }
    }
}

impl FromStr for ChainId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, reference) = s.split_once(':').ok_or_else(|| CaipError::Chain(s.into()))?;
        if !valid_namespace(namespace) || !valid_reference(reference, 32, b"-_") {
            return Err(CaipError::Chain(s.into()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        })
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

/// CAIP-10 `<chain id>:<address>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub chain: ChainId,
    pub address: String,
}

impl FromStr for AccountId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, address) = s.rsplit_once(':').ok_or_else(|| CaipError::Account(s.into()))?;
        let chain = chain.parse::<ChainId>().map_err(|_| CaipError::Account(s.into()))?;
        if !valid_reference(address, 128, b"-.%") {
            return Err(CaipError::Account(s.into()));
        }
        Ok(Self {
            chain,
            address: address.to_string(),
        })
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.address)
    }
}

/// CAIP-19 `<chain id>/<asset namespace>:<asset reference>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId {
    pub chain: ChainId,
    pub asset_namespace: String,
    pub asset_reference: String,
}

impl AssetId {
    pub fn rpc_route(&self) -> Option<RpcRoute> {
        self.chain.rpc_route()
    }
}

impl FromStr for AssetId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CaipError::Asset(s.into());
        let (chain, asset) = s.split_once('/').ok_or_else(malformed)?;
        let chain = chain.parse::<ChainId>().map_err(|_| malformed())?;
        let (namespace, reference) = asset.split_once(':').ok_or_else(malformed)?;
        if !valid_namespace(namespace) || !valid_reference(reference, 128, b".%-") {
            return Err(malformed());
        }
        Ok(Self {
            chain,
            asset_namespace: namespace.to_string(),
            asset_reference: reference.to_string(),
        })
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.chain, self.asset_namespace, self.asset_reference)
    }
}

pub fn is_supported_usdc(asset_id: &str) -> bool {
    SUPPORTED_USDC.contains(&asset_id)
}

pub fn supported_usdc() -> Vec<AssetId> {
    SUPPORTED_USDC
        .iter()
        .filter_map(|id| id.parse::<AssetId>().ok())
        .collect()
}
