use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use content::StoreError;
use thiserror::Error;
use tracing::error;

use crate::pages;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Error text kept on 500 responses so debug mode can show it.
#[derive(Clone)]
pub struct ErrorDetail(pub String);

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AppError::NotFound,
            StoreError::Validation { .. } => AppError::Validation(e.to_string()),
            StoreError::Conflict { .. } => AppError::Conflict(e.to_string()),
            StoreError::Database(_) | StoreError::Migration(_) => AppError::InternalError(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(pages::not_found())).into_response(),
            AppError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()).into_response(),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()).into_response(),
            AppError::InternalError(detail) => {
                error!("Internal error: {detail}");

                let mut response =
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
                response.extensions_mut().insert(ErrorDetail(detail));
                response
            }
        }
    }
}

/// Swaps the generic 500 body for the actual error. Only installed with DEBUG on.
pub async fn expose_details(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() {
        *response.body_mut() = Body::from(format!("Internal Server Error\n\n{detail}"));
    }

    response
}
