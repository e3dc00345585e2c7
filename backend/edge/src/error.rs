use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("STATIC_URL cannot be the site root, the proxy would never be reached")]
    RootStaticPrefix,

    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(reqwest::Error),

    #[error("Upstream timed out")]
    Timeout,

    #[error("Request body larger than {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Unavailable(e)
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        (status, format!("{} {reason}", status.as_u16())).into_response()
    }
}
