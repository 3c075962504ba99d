//! Error classification and JSON error responses.
//!
//! Every denial produced by the shield goes through [`DenialKind`], so the
//! kind → status → code mapping lives in one place. Bodies carry a
//! machine-readable `code` and a human `message`, never internal details.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Closed set of reasons a request is turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialKind {
    RateLimitExceeded,
    CorsRejected,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalError,
}

impl DenialKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::CorsRejected | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::CorsRejected => "CORS_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "FORBIDDEN").
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Seconds until the client may retry; only set for rate limiting.
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Build the error response for `kind` with a caller-facing message.
pub fn error_response(kind: DenialKind, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: kind.code(),
            message: message.into(),
            retry_after: None,
        },
    };
    (kind.status(), Json(body)).into_response()
}

/// 429 response with both the body hint and the `Retry-After` header.
pub fn rate_limited_response(retry_after: u64) -> Response {
    let kind = DenialKind::RateLimitExceeded;
    let body = ErrorResponse {
        error: ErrorBody {
            code: kind.code(),
            message: "Too many requests, please try again later".to_string(),
            retry_after: Some(retry_after),
        },
    };
    let mut response = (kind.status(), Json(body)).into_response();
    response
        .headers_mut()
        .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
