pub mod evm_rpc;
pub mod solana_rpc;
pub mod status;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::upstream::UpstreamResponse;

/// Plain-text 405 for anything but POST
pub(crate) async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        "Method Not Allowed",
    )
        .into_response()
}

/// Relay an upstream reply with its own status and body
pub(crate) fn relay_response(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        upstream.body,
    )
        .into_response()
}
