use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use log::error;
use std::collections::HashMap;

use super::relay_response;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::error::ProxyError;

/// `POST /.netlify/functions/evm-rpc?chainId=<id>`
pub async fn evm_rpc(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let Some(chain_id) = params.get("chainId").filter(|id| !id.trim().is_empty()) else {
        return ApiError::from(ProxyError::MissingChainId).into_response();
    };

    match state.evm.forward(chain_id, body).await {
        Ok(upstream) => relay_response(upstream),
        Err(err) => {
            if let ProxyError::AllUpstreamsFailed(ref failed) = err {
                error!(
                    "evm-rpc chainId={}: {} (last: {})",
                    chain_id,
                    failed,
                    failed
                        .last
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "none".to_string())
                );
            }
            ApiError::from(err).into_response()
        }
    }
}
