//! Error types for the proxy server
//!
//! Every non-2xx response carries the same body shape:
//! `{"error": "<kind>", "message": "<human readable text>"}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Error Kind ==
/// Stable error identifiers used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    RateLimited,
    MethodNotAllowed,
    UpstreamError,
    UpstreamTimeout,
    StoreUnavailable,
    InternalError,
}

impl ErrorKind {
    /// Wire representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::InternalError => "internal_error",
        }
    }

    /// HTTP status for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::UpstreamError | ErrorKind::UpstreamTimeout => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == App Error Enum ==
/// Unified error type for the proxy server.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed or disallowed target URL
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Client exceeded its admission budget
    #[error("Too many requests")]
    RateLimited {
        /// Seconds until the client is admitted again
        retry_after_secs: u64,
    },

    /// Only GET is served
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Upstream answered with a non-2xx status or the transport failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream did not answer within the configured timeout
    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    /// Shared store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the wire kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::ValidationError,
            AppError::RateLimited { .. } => ErrorKind::RateLimited,
            AppError::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            AppError::Upstream(_) => ErrorKind::UpstreamError,
            AppError::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            AppError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            AppError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Message safe to show to the client.
    ///
    /// Server-side failures never expose their internal detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::RateLimited { .. } => "Too many requests".to_string(),
            AppError::MethodNotAllowed => "Only GET requests are supported".to_string(),
            AppError::Upstream(_) => "Failed to fetch from upstream".to_string(),
            AppError::UpstreamTimeout(_) => "Upstream request timed out".to_string(),
            AppError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status();

        if status.is_server_error() {
            error!(kind = kind.as_str(), "{}", self);
        }

        let body = Json(ErrorResponse::new(kind, self.public_message()));
        let mut response = (status, body).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the proxy server.
pub type Result<T> = std::result::Result<T, AppError>;
