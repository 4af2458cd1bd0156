//! EVM JSON-RPC proxy
//!
//! Each supported chain has up to two keyed endpoints (`<PREFIX>_RPC_1`,
//! `<PREFIX>_RPC_2`) followed by a public endpoint, so the candidate list for
//! a supported chain is never empty.

use axum::body::Bytes;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::chains::EvmChain;
use crate::config::{ProxyConfig, UnsupportedChainPolicy};
use crate::error::{ProxyError, ProxyResult};
use crate::upstream::{relay, UpstreamEndpoint, UpstreamResponse, UpstreamSender};

pub struct EvmProxy {
    keyed: HashMap<EvmChain, Vec<String>>,
    fallbacks: HashMap<EvmChain, String>,
    unsupported_chain: UnsupportedChainPolicy,
    sender: Arc<dyn UpstreamSender>,
}

impl EvmProxy {
    pub fn new(config: &ProxyConfig, sender: Arc<dyn UpstreamSender>) -> Self {
        let fallbacks = EvmChain::ALL
            .into_iter()
            .map(|chain| (chain, config.evm_fallback(chain).to_string()))
            .collect();

        Self {
            keyed: config.evm_endpoints.clone(),
            fallbacks,
            unsupported_chain: config.unsupported_chain,
            sender,
        }
    }

    fn fallback(&self, chain: EvmChain) -> UpstreamEndpoint {
        let url = self
            .fallbacks
            .get(&chain)
            .map(String::as_str)
            .unwrap_or_else(|| chain.public_rpc());
        UpstreamEndpoint::new(url)
    }

    /// Ordered candidates for a raw `chainId` value, rebuilt on every call
    pub fn candidates(&self, chain_id: &str) -> ProxyResult<Vec<UpstreamEndpoint>> {
        let chain_id = chain_id.trim();
        if chain_id.is_empty() {
            return Err(ProxyError::MissingChainId);
        }

        let Some(chain) = EvmChain::from_query(chain_id) else {
            return match self.unsupported_chain {
                UnsupportedChainPolicy::Reject => {
                    Err(ProxyError::UnsupportedChain(chain_id.to_string()))
                }
                UnsupportedChainPolicy::FallbackToEthereum => {
                    warn!(
                        "chainId {} is not supported, routing to the Ethereum public endpoint",
                        chain_id
                    );
                    Ok(vec![self.fallback(EvmChain::Ethereum)])
                }
            };
        };

        let mut candidates: Vec<UpstreamEndpoint> = self
            .keyed
            .get(&chain)
            .into_iter()
            .flatten()
            .map(UpstreamEndpoint::new)
            .collect();
        candidates.push(self.fallback(chain));
        Ok(candidates)
    }

    /// Forward a JSON-RPC body for `chain_id`; the payload is passed through untouched
    pub async fn forward(&self, chain_id: &str, body: Bytes) -> ProxyResult<UpstreamResponse> {
        let candidates = self.candidates(chain_id)?;
        let response = relay(self.sender.as_ref(), &candidates, body).await?;
        info!(
            "evm-rpc chainId={} answered {} ({} candidates)",
            chain_id.trim(),
            response.status,
            candidates.len()
        );
        Ok(response)
    }
}
