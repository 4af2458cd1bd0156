//! Proxy configuration
//!
//! Provider keys come from the process environment (or any lookup function in
//! tests). Server settings can additionally be loaded from a YAML file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::chains::{EvmChain, SOLANA_PUBLIC_RPC};
use crate::upstream::DEFAULT_UPSTREAM_TIMEOUT;

pub const HELIUS_API_KEY: &str = "HELIUS_API_KEY";
pub const ZAN_SOLANA_KEY: &str = "ZAN_SOLANA_KEY";
pub const LAVA_SOLANA_KEY: &str = "LAVA_SOLANA_KEY";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8888";

/// Largest JSON-RPC request body accepted on the proxy routes
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("unknown unsupported-chain policy '{0}' (expected 'reject' or 'fallback_to_ethereum')")]
    InvalidPolicy(String),
}

/// What the EVM proxy does with a `chainId` outside the supported table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedChainPolicy {
    /// Answer 400 instead of guessing a chain
    #[default]
    Reject,
    /// Route to the Ethereum public endpoint
    FallbackToEthereum,
}

impl FromStr for UnsupportedChainPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reject" => Ok(Self::Reject),
            "fallback_to_ethereum" | "ethereum" => Ok(Self::FallbackToEthereum),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Premium Solana provider keys; absent keys drop the provider entirely
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SolanaKeys {
    pub helius: Option<String>,
    pub zan: Option<String>,
    pub lava: Option<String>,
}

impl fmt::Debug for SolanaKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaKeys")
            .field("helius", &self.helius.is_some())
            .field("zan", &self.zan.is_some())
            .field("lava", &self.lava.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct ProxyConfig {
    pub listen_addr: SocketAddr,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
    pub unsupported_chain: UnsupportedChainPolicy,
    /// Keyed endpoints per chain, primary first
    pub evm_endpoints: HashMap<EvmChain, Vec<String>>,
    /// Public endpoint appended after the keyed ones
    pub evm_fallbacks: HashMap<EvmChain, String>,
    pub solana: SolanaKeys,
    pub solana_fallback: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8888))),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            unsupported_chain: UnsupportedChainPolicy::default(),
            evm_endpoints: HashMap::new(),
            evm_fallbacks: EvmChain::ALL
                .into_iter()
                .map(|chain| (chain, chain.public_rpc().to_string()))
                .collect(),
            solana: SolanaKeys::default(),
            solana_fallback: SOLANA_PUBLIC_RPC.to_string(),
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyed: HashMap<&EvmChain, usize> =
            self.evm_endpoints.iter().map(|(chain, urls)| (chain, urls.len())).collect();
        f.debug_struct("ProxyConfig")
            .field("listen_addr", &self.listen_addr)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("unsupported_chain", &self.unsupported_chain)
            .field("evm_keyed_endpoints", &keyed)
            .field("solana", &self.solana)
            .finish()
    }
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| non_empty(lookup(name));

        let evm_endpoints = EvmChain::ALL
            .into_iter()
            .filter_map(|chain| {
                let urls: Vec<String> = chain.key_vars().iter().filter_map(|var| get(var)).collect();
                (!urls.is_empty()).then_some((chain, urls))
            })
            .collect();

        Self {
            evm_endpoints,
            solana: SolanaKeys {
                helius: get(HELIUS_API_KEY),
                zan: get(ZAN_SOLANA_KEY),
                lava: get(LAVA_SOLANA_KEY),
            },
            ..Self::default()
        }
    }

    pub fn apply_settings(&mut self, settings: &ServerSettings) -> Result<(), ConfigError> {
        if let Some(addr) = settings.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(secs) = settings.upstream_timeout_secs {
            self.set_upstream_timeout_secs(secs)?;
        }
        if let Some(bytes) = settings.max_body_bytes {
            self.set_max_body_bytes(bytes)?;
        }
        if let Some(policy) = settings.unsupported_chain {
            self.unsupported_chain = policy;
        }
        for (chain, url) in &settings.evm_fallbacks {
            self.evm_fallbacks.insert(*chain, url.clone());
        }
        if let Some(url) = &settings.solana_fallback {
            self.solana_fallback = url.clone();
        }
        Ok(())
    }

    /// A zero timeout would fail every upstream call
    pub fn set_upstream_timeout_secs(&mut self, secs: u64) -> Result<(), ConfigError> {
        if secs == 0 {
            return Err(ConfigError::ZeroValue("upstream_timeout_secs"));
        }
        self.upstream_timeout = Duration::from_secs(secs);
        Ok(())
    }

    pub fn set_max_body_bytes(&mut self, bytes: usize) -> Result<(), ConfigError> {
        if bytes == 0 {
            return Err(ConfigError::ZeroValue("max_body_bytes"));
        }
        self.max_body_bytes = bytes;
        Ok(())
    }

    pub fn keyed_endpoints(&self, chain: EvmChain) -> &[String] {
        self.evm_endpoints.get(&chain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn evm_fallback(&self, chain: EvmChain) -> &str {
        self.evm_fallbacks
            .get(&chain)
            .map(String::as_str)
            .unwrap_or_else(|| chain.public_rpc())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Optional YAML settings; every field left out keeps its default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub listen_addr: Option<SocketAddr>,
    pub upstream_timeout_secs: Option<u64>,
    pub max_body_bytes: Option<usize>,
    pub unsupported_chain: Option<UnsupportedChainPolicy>,
    pub evm_fallbacks: HashMap<EvmChain, String>,
    pub solana_fallback: Option<String>,
}

impl ServerSettings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}
