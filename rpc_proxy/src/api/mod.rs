//! HTTP surface of the proxy

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ApiResult};
pub use crate::chains::{EVM_RPC_PATH, SOLANA_RPC_PATH};
pub use server::{create_router, start_proxy_server, AppState};
