use thiserror::Error;

use crate::failover::AllFailed;

pub const MISSING_CHAIN_ID: &str = "Missing chainId query parameter";
pub const ALL_ENDPOINTS_FAILED: &str = "All RPC endpoints failed";

/// Errors a proxy call can end in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("{}", MISSING_CHAIN_ID)]
    MissingChainId,

    #[error("Unsupported chainId: {0}")]
    UnsupportedChain(String),

    #[error("{}", ALL_ENDPOINTS_FAILED)]
    AllUpstreamsFailed(#[from] AllFailed),
}

pub type ProxyResult<T> = Result<T, ProxyError>;
