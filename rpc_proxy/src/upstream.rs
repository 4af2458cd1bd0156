//! Upstream endpoints and the HTTP transport used to reach them

use async_trait::async_trait;
use axum::body::Bytes;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::failover::{is_retryable_status, select_first_successful, AllFailed, RpcReply};

/// Default per-candidate timeout
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// A node URL. Keyed URLs embed a provider secret, so `Debug` and `label`
/// only ever show the host.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamEndpoint {
    url: String,
    label: String,
}

impl UpstreamEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let label = redact(&url);
        Self { url, label }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
            _ => "<opaque url>".to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Status and body text of an upstream reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl RpcReply for UpstreamResponse {
    fn status(&self) -> u16 {
        self.status
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Posts a JSON-RPC body to one upstream
#[async_trait]
pub trait UpstreamSender: Send + Sync {
    async fn post_json(
        &self,
        endpoint: &UpstreamEndpoint,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

/// reqwest-backed sender sharing one connection pool across requests
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamSender for HttpUpstream {
    async fn post_json(
        &self,
        endpoint: &UpstreamEndpoint,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                UpstreamError::Timeout {
                    endpoint: endpoint.label().to_string(),
                }
            } else {
                // Strip the URL so provider keys never reach the logs
                UpstreamError::Transport {
                    endpoint: endpoint.label().to_string(),
                    reason: e.without_url().to_string(),
                }
            }
        };

        let response = self
            .client
            .post(endpoint.url())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        debug!("{} -> {} ({} bytes)", endpoint.label(), status, body.len());

        Ok(UpstreamResponse { status, body })
    }
}

/// Forward `body` through `candidates` with the standard retry policy
pub async fn relay(
    sender: &dyn UpstreamSender,
    candidates: &[UpstreamEndpoint],
    body: Bytes,
) -> Result<UpstreamResponse, AllFailed> {
    select_first_successful(
        candidates,
        |reply: &UpstreamResponse| is_retryable_status(reply.status),
        |endpoint| sender.post_json(endpoint, body.clone()),
    )
    .await
}
