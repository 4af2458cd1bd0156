use anyhow::Result;
use clap::Parser;
use ghostflow_rpc_proxy::{
    api::start_proxy_server,
    config::{ProxyConfig, ServerSettings, UnsupportedChainPolicy},
};
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;

/// GhostFlow RPC proxy arguments
#[derive(Parser)]
#[clap(name = "ghostflow-proxy")]
#[clap(about = "JSON-RPC failover proxy for EVM and Solana upstreams")]
struct Args {
    /// Optional YAML settings file
    #[clap(long)]
    config_path: Option<PathBuf>,

    /// Address to listen on
    #[clap(long)]
    listen: Option<SocketAddr>,

    /// Per-upstream timeout in seconds
    #[clap(long)]
    upstream_timeout_secs: Option<u64>,

    /// Request body cap in bytes on the proxy routes
    #[clap(long)]
    max_body_bytes: Option<usize>,

    /// What to do with an unknown chainId: reject | fallback_to_ethereum
    #[clap(long)]
    unsupported_chain: Option<UnsupportedChainPolicy>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Keys from the environment, then file settings, then flags
    let mut config = ProxyConfig::from_env();
    if let Some(path) = &args.config_path {
        info!("Loading settings from {:?}", path);
        config.apply_settings(&ServerSettings::from_file(path)?)?;
    }
    if let Some(addr) = args.listen {
        config.listen_addr = addr;
    }
    if let Some(secs) = args.upstream_timeout_secs {
        config.set_upstream_timeout_secs(secs)?;
    }
    if let Some(bytes) = args.max_body_bytes {
        config.set_max_body_bytes(bytes)?;
    }
    if let Some(policy) = args.unsupported_chain {
        config.unsupported_chain = policy;
    }

    start_proxy_server(config).await
}
