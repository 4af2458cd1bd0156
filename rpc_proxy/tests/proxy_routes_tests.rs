//! End-to-end tests for the proxy routes
//! Fake upstreams are real axum servers on loopback ports

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use ghostflow_rpc_proxy::{
    api::{create_router, AppState, EVM_RPC_PATH, SOLANA_RPC_PATH},
    chains::EvmChain,
    config::{ProxyConfig, SolanaKeys, UnsupportedChainPolicy},
    upstream::{HttpUpstream, UpstreamEndpoint, UpstreamError, UpstreamResponse, UpstreamSender},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const RPC_CALL: &str = r#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber","params":[]}"#;

struct FakeUpstream {
    url: String,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(Option<String>, String)>>>,
}

impl FakeUpstream {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn spawn_upstream(status: u16, reply: &'static str, delay: Duration) -> Result<FakeUpstream> {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handler = {
        let hits = hits.clone();
        let seen = seen.clone();
        move |headers: HeaderMap, body: Bytes| {
            let hits = hits.clone();
            let seen = seen.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let content_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.lock()
                    .unwrap()
                    .push((content_type, String::from_utf8_lossy(&body).into_owned()));
                tokio::time::sleep(delay).await;
                (StatusCode::from_u16(status).unwrap(), reply)
            }
        }
    };

    let app = Router::new()
        .route("/", post(handler.clone()))
        .route("/*key", post(handler))
        .layer(DefaultBodyLimit::disable());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(FakeUpstream {
        url: format!("http://{}", addr),
        hits,
        seen,
    })
}

/// Nothing listens on this port once the listener is dropped
async fn dead_url() -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    Ok(format!("http://{}", listener.local_addr()?))
}

fn router(config: &ProxyConfig, timeout: Duration) -> Result<Router> {
    let sender: Arc<dyn UpstreamSender> = Arc::new(HttpUpstream::new(timeout)?);
    Ok(create_router(AppState::new(config, sender)))
}

fn rpc_post(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(RPC_CALL))?)
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn content_type(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_get_is_method_not_allowed() -> Result<()> {
    let app = router(&ProxyConfig::default(), Duration::from_secs(1))?;

    for uri in [
        format!("{}?chainId=1", EVM_RPC_PATH),
        EVM_RPC_PATH.to_string(),
        SOLANA_RPC_PATH.to_string(),
    ] {
        let request = Request::builder().method("GET").uri(&uri).body(Body::empty())?;
        let response = app.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "GET {}", uri);
        assert_eq!(body_text(response).await?, "Method Not Allowed");
    }
    Ok(())
}

/// A JSON-RPC batch of roughly `bytes` bytes
fn rpc_batch(bytes: usize) -> String {
    let calls = bytes / (RPC_CALL.len() + 1) + 1;
    format!("[{}]", vec![RPC_CALL; calls].join(","))
}

#[tokio::test]
async fn test_get_with_oversized_body_is_method_not_allowed() -> Result<()> {
    let app = router(&ProxyConfig::default(), Duration::from_secs(1))?;
    let body = rpc_batch(3 * 1024 * 1024);

    for uri in [format!("{}?chainId=1", EVM_RPC_PATH), SOLANA_RPC_PATH.to_string()] {
        let request = Request::builder()
            .method("GET")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.clone()))?;
        let response = app.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "GET {}", uri);
        assert_eq!(body_text(response).await?, "Method Not Allowed");
    }
    Ok(())
}

#[tokio::test]
async fn test_large_batch_under_limit_is_relayed() -> Result<()> {
    let public = spawn_upstream(200, r#"[{"result":"0x1"}]"#, Duration::ZERO).await?;
    let mut config = ProxyConfig::from_lookup(|_| None);
    config.evm_fallbacks.insert(EvmChain::Ethereum, public.url.clone());

    let batch = rpc_batch(3 * 1024 * 1024);
    assert!(batch.len() > 2 * 1024 * 1024 && batch.len() < config.max_body_bytes);

    let app = router(&config, Duration::from_secs(10))?;
    let request = Request::builder()
        .method("POST")
        .uri(format!("{}?chainId=1", EVM_RPC_PATH))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(batch.clone()))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, r#"[{"result":"0x1"}]"#);
    let seen = public.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, batch);
    Ok(())
}

#[tokio::test]
async fn test_body_over_configured_limit_is_rejected() -> Result<()> {
    let public = spawn_upstream(200, "{}", Duration::ZERO).await?;
    let mut config = ProxyConfig::from_lookup(|_| None);
    config.evm_fallbacks.insert(EvmChain::Ethereum, public.url.clone());
    config.set_max_body_bytes(1024)?;

    let app = router(&config, Duration::from_secs(5))?;
    let request = Request::builder()
        .method("POST")
        .uri(format!("{}?chainId=1", EVM_RPC_PATH))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(rpc_batch(4096)))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(public.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_chain_id() -> Result<()> {
    let app = router(&ProxyConfig::default(), Duration::from_secs(1))?;

    for uri in [EVM_RPC_PATH.to_string(), format!("{}?chainId=", EVM_RPC_PATH)] {
        let response = app.clone().oneshot(rpc_post(&uri)?).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&response), Some("application/json"));
        assert_eq!(
            body_text(response).await?,
            r#"{"error":"Missing chainId query parameter"}"#
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_public_fallback_only_relays_body_unchanged() -> Result<()> {
    let public = spawn_upstream(200, r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#, Duration::ZERO).await?;
    let mut config = ProxyConfig::from_lookup(|_| None);
    config.evm_fallbacks.insert(EvmChain::Ethereum, public.url.clone());

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=1", EVM_RPC_PATH))?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), Some("application/json"));
    assert_eq!(body_text(response).await?, r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#);
    assert_eq!(public.hits(), 1);

    let seen = public.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(Some("application/json".to_string()), RPC_CALL.to_string())]);
    Ok(())
}

#[tokio::test]
async fn test_retryable_upstreams_are_skipped_and_later_ones_untouched() -> Result<()> {
    let limited = spawn_upstream(429, "slow down", Duration::ZERO).await?;
    let healthy = spawn_upstream(200, r#"{"result":"ok"}"#, Duration::ZERO).await?;
    let public = spawn_upstream(200, r#"{"result":"public"}"#, Duration::ZERO).await?;

    let limited_url = format!("{}/v2/key-one", limited.url);
    let healthy_url = format!("{}/v2/key-two", healthy.url);
    let mut config = ProxyConfig::from_lookup(|name| match name {
        "POLYGON_RPC_1" => Some(limited_url.clone()),
        "POLYGON_RPC_2" => Some(healthy_url.clone()),
        _ => None,
    });
    config.evm_fallbacks.insert(EvmChain::Polygon, public.url.clone());

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=137", EVM_RPC_PATH))?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, r#"{"result":"ok"}"#);
    assert_eq!(limited.hits(), 1);
    assert_eq!(healthy.hits(), 1);
    assert_eq!(public.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_client_error_is_passed_through() -> Result<()> {
    let picky = spawn_upstream(400, r#"{"error":"bad request"}"#, Duration::ZERO).await?;
    let public = spawn_upstream(200, "{}", Duration::ZERO).await?;

    let picky_url = picky.url.clone();
    let mut config = ProxyConfig::from_lookup(|name| (name == "BSC_RPC_1").then(|| picky_url.clone()));
    config.evm_fallbacks.insert(EvmChain::Bsc, public.url.clone());

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=56", EVM_RPC_PATH))?).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await?, r#"{"error":"bad request"}"#);
    assert_eq!(public.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_all_upstreams_failing_is_503() -> Result<()> {
    let broken = spawn_upstream(500, "boom", Duration::ZERO).await?;
    let also_broken = spawn_upstream(502, "bad gateway", Duration::ZERO).await?;
    let dead = dead_url().await?;

    let broken_url = broken.url.clone();
    let mut config = ProxyConfig::from_lookup(|name| match name {
        "ARBITRUM_RPC_1" => Some(broken_url.clone()),
        "ARBITRUM_RPC_2" => Some(dead.clone()),
        _ => None,
    });
    config.evm_fallbacks.insert(EvmChain::Arbitrum, also_broken.url.clone());

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=42161", EVM_RPC_PATH))?).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(content_type(&response), Some("application/json"));
    assert_eq!(body_text(response).await?, r#"{"error":"All RPC endpoints failed"}"#);
    assert_eq!(broken.hits(), 1);
    assert_eq!(also_broken.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn test_slow_upstream_times_out_and_next_is_used() -> Result<()> {
    let stalled = spawn_upstream(200, r#"{"result":"late"}"#, Duration::from_secs(5)).await?;
    let public = spawn_upstream(200, r#"{"result":"fast"}"#, Duration::ZERO).await?;

    let stalled_url = stalled.url.clone();
    let mut config = ProxyConfig::from_lookup(|name| (name == "BASE_RPC_1").then(|| stalled_url.clone()));
    config.evm_fallbacks.insert(EvmChain::Base, public.url.clone());

    let app = router(&config, Duration::from_millis(300))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=8453", EVM_RPC_PATH))?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, r#"{"result":"fast"}"#);
    assert_eq!(stalled.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unsupported_chain_policies() -> Result<()> {
    let public = spawn_upstream(200, r#"{"result":"eth"}"#, Duration::ZERO).await?;
    let mut config = ProxyConfig::default();
    config.evm_fallbacks.insert(EvmChain::Ethereum, public.url.clone());

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=250", EVM_RPC_PATH))?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await?, r#"{"error":"Unsupported chainId: 250"}"#);
    assert_eq!(public.hits(), 0);

    config.unsupported_chain = UnsupportedChainPolicy::FallbackToEthereum;
    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(&format!("{}?chainId=250", EVM_RPC_PATH))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, r#"{"result":"eth"}"#);
    assert_eq!(public.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn test_solana_without_keys_uses_public_endpoint() -> Result<()> {
    let public = spawn_upstream(200, r#"{"result":{"slot":1}}"#, Duration::ZERO).await?;
    let config = ProxyConfig {
        solana: SolanaKeys::default(),
        solana_fallback: public.url.clone(),
        ..ProxyConfig::default()
    };

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(SOLANA_RPC_PATH)?).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, r#"{"result":{"slot":1}}"#);
    assert_eq!(public.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn test_solana_all_failed() -> Result<()> {
    let limited = spawn_upstream(429, "", Duration::ZERO).await?;
    let config = ProxyConfig {
        solana_fallback: limited.url.clone(),
        ..ProxyConfig::default()
    };

    let app = router(&config, Duration::from_secs(5))?;
    let response = app.oneshot(rpc_post(SOLANA_RPC_PATH)?).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await?, r#"{"error":"All RPC endpoints failed"}"#);
    Ok(())
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let app = router(&ProxyConfig::default(), Duration::from_secs(1))?;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

/// Upstream that never answers in time and records what happened to the call
#[derive(Default)]
struct StalledSender {
    started: AtomicUsize,
    completed: AtomicBool,
    dropped: AtomicBool,
}

struct SetOnDrop<'a>(&'a AtomicBool);

impl Drop for SetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UpstreamSender for StalledSender {
    async fn post_json(
        &self,
        _endpoint: &UpstreamEndpoint,
        _body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let on_drop = SetOnDrop(&self.dropped);
        tokio::time::sleep(Duration::from_secs(30)).await;
        self.completed.store(true, Ordering::SeqCst);
        std::mem::forget(on_drop);
        Ok(UpstreamResponse {
            status: 200,
            body: "{}".to_string(),
        })
    }
}

#[tokio::test]
async fn test_dropped_request_aborts_in_flight_upstream() -> Result<()> {
    let sender = Arc::new(StalledSender::default());
    let config = ProxyConfig::from_lookup(|name| match name {
        "ETH_RPC_1" => Some("http://127.0.0.1:9/first".to_string()),
        "ETH_RPC_2" => Some("http://127.0.0.1:9/second".to_string()),
        _ => None,
    });
    let upstream: Arc<dyn UpstreamSender> = sender.clone();
    let app = create_router(AppState::new(&config, upstream));

    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        app.oneshot(rpc_post(&format!("{}?chainId=1", EVM_RPC_PATH))?),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(sender.started.load(Ordering::SeqCst), 1);
    assert!(sender.dropped.load(Ordering::SeqCst));
    assert!(!sender.completed.load(Ordering::SeqCst));
    Ok(())
}
