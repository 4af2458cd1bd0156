use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use log::error;

use super::relay_response;
use crate::api::errors::ApiError;
use crate::api::server::AppState;

/// `POST /.netlify/functions/solana-rpc`
pub async fn solana_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    match state.solana.forward(body).await {
        Ok(upstream) => relay_response(upstream),
        Err(err) => {
            error!("solana-rpc: {:?}", err);
            ApiError::from(err).into_response()
        }
    }
}
