//! GhostFlow JSON-RPC failover proxy
//!
//! Forwards browser JSON-RPC calls to EVM and Solana node providers so that
//! provider API keys stay on the server. Upstreams are tried in a fixed order
//! and a candidate is skipped when it rate-limits, errors with a 5xx, or
//! cannot be reached.

pub mod api;
pub mod caip;
pub mod chains;
pub mod config;
pub mod env_export;
pub mod error;
pub mod evm;
pub mod failover;
pub mod solana;
pub mod transport;
pub mod upstream;

pub use config::{ProxyConfig, UnsupportedChainPolicy};
pub use error::ProxyError;
pub use upstream::{HttpUpstream, UpstreamEndpoint, UpstreamResponse, UpstreamSender};
