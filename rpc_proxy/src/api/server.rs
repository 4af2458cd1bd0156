use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{
    evm_rpc::evm_rpc, method_not_allowed, solana_rpc::solana_rpc, status::health_check,
};
use crate::chains::{EVM_RPC_PATH, SOLANA_RPC_PATH};
use crate::config::ProxyConfig;
use crate::evm::EvmProxy;
use crate::solana::SolanaProxy;
use crate::upstream::{HttpUpstream, UpstreamSender};

/// Shared, read-only handler state
#[derive(Clone)]
pub struct AppState {
    pub evm: Arc<EvmProxy>,
    pub solana: Arc<SolanaProxy>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(config: &ProxyConfig, sender: Arc<dyn UpstreamSender>) -> Self {
        Self {
            evm: Arc::new(EvmProxy::new(config, sender.clone())),
            solana: Arc::new(SolanaProxy::new(config, sender)),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Non-POST is answered before any body extraction
    Router::new()
        .route("/health", get(health_check))
        .route(EVM_RPC_PATH, post(evm_rpc).fallback(method_not_allowed))
        .route(SOLANA_RPC_PATH, post(solana_rpc).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn start_proxy_server(config: ProxyConfig) -> Result<()> {
    info!("Starting GhostFlow RPC proxy with {:?}", config);

    let sender: Arc<dyn UpstreamSender> = Arc::new(HttpUpstream::new(config.upstream_timeout)?);
    let app = create_router(AppState::new(&config, sender));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("RPC proxy listening on http://{}", listener.local_addr()?);
    info!("  POST {}?chainId=<id>", EVM_RPC_PATH);
    info!("  POST {}", SOLANA_RPC_PATH);
    info!("  GET  /health");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("RPC proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
