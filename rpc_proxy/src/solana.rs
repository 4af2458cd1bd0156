//! Solana JSON-RPC proxy
//!
//! Premium providers are tried in a fixed order (Helius, Zan, Lava); a
//! provider without a configured key is left out of the list, and the public
//! endpoint always comes last.

use axum::body::Bytes;
use log::info;
use std::sync::Arc;

use crate::config::{ProxyConfig, SolanaKeys};
use crate::error::ProxyResult;
use crate::upstream::{relay, UpstreamEndpoint, UpstreamResponse, UpstreamSender};

/// Premium Solana providers, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolanaProvider {
    Helius,
    Zan,
    Lava,
}

impl SolanaProvider {
    pub const PRIORITY: [SolanaProvider; 3] =
        [SolanaProvider::Helius, SolanaProvider::Zan, SolanaProvider::Lava];

    pub fn url_with_key(self, key: &str) -> String {
        match self {
            SolanaProvider::Helius => format!("https://mainnet.helius-rpc.com/?api-key={}", key),
            SolanaProvider::Zan => format!("https://api.zan.top/node/v1/solana/mainnet/{}", key),
            SolanaProvider::Lava => {
                format!("https://g.w.lavanet.xyz:443/gateway/solana/rpc-http/{}", key)
            }
        }
    }

    fn key(self, keys: &SolanaKeys) -> Option<&str> {
        match self {
            SolanaProvider::Helius => keys.helius.as_deref(),
            SolanaProvider::Zan => keys.zan.as_deref(),
            SolanaProvider::Lava => keys.lava.as_deref(),
        }
    }
}

pub struct SolanaProxy {
    keys: SolanaKeys,
    fallback: String,
    sender: Arc<dyn UpstreamSender>,
}

impl SolanaProxy {
    pub fn new(config: &ProxyConfig, sender: Arc<dyn UpstreamSender>) -> Self {
        Self {
            keys: config.solana.clone(),
            fallback: config.solana_fallback.clone(),
            sender,
        }
    }

    pub fn candidates(&self) -> Vec<UpstreamEndpoint> {
        SolanaProvider::PRIORITY
            .into_iter()
            .filter_map(|provider| {
                provider
                    .key(&self.keys)
                    .map(|key| UpstreamEndpoint::new(provider.url_with_key(key)))
            })
            .chain(std::iter::once(UpstreamEndpoint::new(self.fallback.as_str())))
            .collect()
    }

    pub async fn forward(&self, body: Bytes) -> ProxyResult<UpstreamResponse> {
        let candidates = self.candidates();
        let response = relay(self.sender.as_ref(), &candidates, body).await?;
        info!(
            "solana-rpc answered {} ({} candidates)",
            response.status,
            candidates.len()
        );
        Ok(response)
    }
}
