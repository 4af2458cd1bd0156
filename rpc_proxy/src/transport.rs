//! Client-side transport selection
//!
//! Decides, per chain, whether a client talks to the proxy or directly to a
//! short list of node URLs, and provides the fallback transport used in the
//! direct case. Variables are the `NEXT_PUBLIC_*` ones the web app is built
//! with.

use axum::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::chains::{EvmChain, EVM_RPC_PATH, SOLANA_PUBLIC_RPC, SOLANA_RPC_PATH};
use crate::failover::Failure;
use crate::upstream::{relay, UpstreamEndpoint, UpstreamResponse, UpstreamSender};

pub const SITE_URL: &str = "NEXT_PUBLIC_SITE_URL";
pub const USE_EVM_PROXY: &str = "NEXT_PUBLIC_USE_EVM_PROXY";
pub const USE_SOLANA_PROXY: &str = "NEXT_PUBLIC_SOLANA_USE_PROXY";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientTransportConfig {
    /// Site origin without a trailing slash
    pub site_url: Option<String>,
    pub use_evm_proxy: bool,
    pub use_solana_proxy: bool,
    pub evm_direct: HashMap<EvmChain, Vec<String>>,
    pub solana_direct: Vec<String>,
}

impl ClientTransportConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let flag = |name: &str| lookup(name).as_deref() == Some("true");

        let evm_direct = EvmChain::ALL
            .into_iter()
            .filter_map(|chain| {
                let urls: Vec<String> = chain
                    .key_vars()
                    .iter()
                    .filter_map(|var| get(&format!("NEXT_PUBLIC_{}", var)))
                    .collect();
                (!urls.is_empty()).then_some((chain, urls))
            })
            .collect();

        let primary = lookup("NEXT_PUBLIC_SOLANA_RPC")
            .or_else(|| lookup("NEXT_PUBLIC_SOLANA_RPC_1"))
            .filter(|v| !v.is_empty());
        let solana_direct = primary
            .into_iter()
            .chain(get("NEXT_PUBLIC_SOLANA_RPC_2"))
            .chain(get("NEXT_PUBLIC_SOLANA_RPC_3"))
            .collect();

        Self {
            site_url: get(SITE_URL).map(|url| url.strip_suffix('/').map(str::to_string).unwrap_or(url)),
            use_evm_proxy: flag(USE_EVM_PROXY),
            use_solana_proxy: flag(USE_SOLANA_PROXY),
            evm_direct,
            solana_direct,
        }
    }

    pub fn evm_proxy_url(&self, chain: EvmChain) -> Option<String> {
        let site = self.site_url.as_deref()?;
        self.use_evm_proxy
            .then(|| format!("{}{}?chainId={}", site, EVM_RPC_PATH, chain.id()))
    }

    /// URLs a client should try for `chain`, in order
    pub fn evm_urls(&self, chain: EvmChain) -> Vec<String> {
        if let Some(proxy) = self.evm_proxy_url(chain) {
            return vec![proxy];
        }
        self.evm_direct
            .get(&chain)
            .into_iter()
            .flatten()
            .cloned()
            .chain(std::iter::once(chain.public_rpc().to_string()))
            .collect()
    }

    pub fn solana_urls(&self) -> Vec<String> {
        if let (true, Some(site)) = (self.use_solana_proxy, self.site_url.as_deref()) {
            return vec![format!("{}{}", site, SOLANA_RPC_PATH)];
        }
        if self.solana_direct.is_empty() {
            return vec![SOLANA_PUBLIC_RPC.to_string()];
        }
        self.solana_direct.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("RPC returned {0}")]
    Status(u16),

    #[error("{0}")]
    Request(String),

    #[error("All Solana RPC endpoints failed")]
    NoEndpoints,
}

impl From<Failure> for TransportError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Status(status) => TransportError::Status(status),
            Failure::Error(reason) => TransportError::Request(reason),
        }
    }
}

/// Tries each URL in order on 429, 5xx or network error. A single URL is a
/// plain pass-through: its reply is returned whatever the status.
pub struct FallbackTransport {
    endpoints: Vec<UpstreamEndpoint>,
    sender: Arc<dyn UpstreamSender>,
}

impl FallbackTransport {
    pub fn new(urls: Vec<String>, sender: Arc<dyn UpstreamSender>) -> Self {
        Self {
            endpoints: urls.into_iter().map(UpstreamEndpoint::new).collect(),
            sender,
        }
    }

    pub fn endpoints(&self) -> &[UpstreamEndpoint] {
        &self.endpoints
    }

    pub async fn send(&self, body: Bytes) -> Result<UpstreamResponse, TransportError> {
        match self.endpoints.as_slice() {
            [] => Err(TransportError::NoEndpoints),
            [only] => self
                .sender
                .post_json(only, body)
                .await
                .map_err(|e| TransportError::Request(e.to_string())),
            endpoints => relay(self.sender.as_ref(), endpoints, body)
                .await
                .map_err(|failed| {
                    failed
                        .last
                        .map(TransportError::from)
                        .unwrap_or(TransportError::NoEndpoints)
                }),
        }
    }
}
