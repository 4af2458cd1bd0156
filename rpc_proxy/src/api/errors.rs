//! API error envelope
//!
//! Every error the proxy produces itself is a JSON object with a single
//! `error` field; upstream errors are relayed verbatim and never pass
//! through here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProxyError, ALL_ENDPOINTS_FAILED};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: u16,
    pub error: String,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            error: message.into(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(400, message)
    }

    pub fn service_unavailable(message: &str) -> Self {
        Self::new(503, message)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.error)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::MissingChainId | ProxyError::UnsupportedChain(_) => {
                Self::bad_request(&err.to_string())
            }
            // Which upstreams failed stays in the server log
            ProxyError::AllUpstreamsFailed(_) => Self::service_unavailable(ALL_ENDPOINTS_FAILED),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
