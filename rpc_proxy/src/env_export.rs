//! Derive the server-side deployment environment from the web app's
//! `.env.local`
//!
//! The browser build holds full provider URLs in `NEXT_PUBLIC_*` variables.
//! For proxy mode those URLs move to server-only variables and the client is
//! switched to the proxy endpoints.

use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::chains::EvmChain;
use crate::config::{HELIUS_API_KEY, LAVA_SOLANA_KEY, ZAN_SOLANA_KEY};
use crate::transport::{SITE_URL, USE_EVM_PROXY, USE_SOLANA_PROXY};

pub const DEFAULT_INPUT: &str = "ghostflow-app/.env.local";
pub const DEFAULT_OUTPUT: &str = ".env.netlify";
pub const DEFAULT_SITE_URL: &str = "https://apokolipzz-ghostflow.netlify.app";
pub const DEFAULT_ENVIRONMENT: &str = "STAGING";

/// Order of the EVM block in the exported file
const EXPORT_ORDER: [EvmChain; 7] = [
    EvmChain::Ethereum,
    EvmChain::Polygon,
    EvmChain::Avalanche,
    EvmChain::Base,
    EvmChain::Arbitrum,
    EvmChain::Optimism,
    EvmChain::Bsc,
];

#[derive(Debug, Error)]
pub enum EnvExportError {
    #[error("{} not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse `KEY=VALUE` lines. Keys cannot contain `#`, so comments are skipped;
/// one leading and one trailing quote are stripped from values.
pub fn parse_dotenv(raw: &str) -> HashMap<String, String> {
    raw.split('\n')
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            if key.is_empty() || key.contains('#') {
                return None;
            }
            Some((key.trim().to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    let value = value
        .strip_prefix(|c| c == '"' || c == '\'')
        .unwrap_or(value);
    value.strip_suffix(|c| c == '"' || c == '\'').unwrap_or(value)
}

/// Value of the `api-key` query parameter of a Helius URL
pub fn extract_helius_key(url: &str) -> String {
    url.split_once("api-key=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or_default())
        .unwrap_or_default()
        .to_string()
}

/// Last non-empty path segment, where path-keyed providers put the key
pub fn extract_path_key(url: &str) -> String {
    url.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Render the `.env.netlify` contents
pub fn render_netlify_env(vars: &HashMap<String, String>) -> String {
    let get = |name: &str| vars.get(name).map(String::as_str).filter(|v| !v.is_empty());

    let site = get(SITE_URL).unwrap_or(DEFAULT_SITE_URL);
    let site = site.strip_suffix('/').unwrap_or(site);

    let mut lines = vec![
        format!("{}=true", USE_SOLANA_PROXY),
        format!("{}=true", USE_EVM_PROXY),
        format!("{}={}", SITE_URL, site),
        format!(
            "NEXT_PUBLIC_ENVIRONMENT={}",
            get("NEXT_PUBLIC_ENVIRONMENT").unwrap_or(DEFAULT_ENVIRONMENT)
        ),
        String::new(),
        format!(
            "{}={}",
            HELIUS_API_KEY,
            extract_helius_key(get("NEXT_PUBLIC_SOLANA_RPC").unwrap_or_default())
        ),
        format!(
            "{}={}",
            ZAN_SOLANA_KEY,
            extract_path_key(get("NEXT_PUBLIC_SOLANA_RPC_2").unwrap_or_default())
        ),
        format!(
            "{}={}",
            LAVA_SOLANA_KEY,
            extract_path_key(get("NEXT_PUBLIC_SOLANA_RPC_3").unwrap_or_default())
        ),
        String::new(),
    ];

    for chain in EXPORT_ORDER {
        for var in chain.key_vars() {
            let value = get(&format!("NEXT_PUBLIC_{}", var)).unwrap_or_default();
            lines.push(format!("{}={}", var, value));
        }
    }

    lines.join("\n")
}

/// Read `input`, write the derived environment to `output`
pub fn export_file(input: &Path, output: &Path) -> Result<(), EnvExportError> {
    if !input.exists() {
        return Err(EnvExportError::InputNotFound(input.to_path_buf()));
    }

    let raw = std::fs::read_to_string(input).map_err(|source| EnvExportError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let vars = parse_dotenv(&raw);
    info!("Read {} variables from {}", vars.len(), input.display());

    std::fs::write(output, render_netlify_env(&vars)).map_err(|source| EnvExportError::Write {
        path: output.to_path_buf(),
        source,
    })
}
