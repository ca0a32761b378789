//! Error types for the server crate.
//!
//! [`ServerError`] covers startup and configuration failures.
//! [`ApiError`] is the outcome of a failed annotation request and maps onto
//! an HTTP status. Response bodies never carry internal detail: clients see
//! the status code and its reason phrase only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] anno_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Failed annotation request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `{user}/{collection}` key does not exist (404).
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The annotation key does not exist (404).
    #[error("annotation not found: {0}")]
    AnnotationNotFound(String),

    /// Missing or unusable payload, or an identifier collision (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other store failure (500). The message is for operators only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::CollectionNotFound(_) | Self::AnnotationNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn for_status(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("Error").to_string();
        Self {
            status_code: status.as_u16(),
            error: reason.clone(),
            message: reason,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(cause) => tracing::error!(%cause, "annotation request failed"),
            other => tracing::debug!(error = %other, "annotation request rejected"),
        }
        (status, axum::Json(ErrorBody::for_status(status))).into_response()
    }
}
