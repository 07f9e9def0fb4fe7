//! Server-side error taxonomy and its JSON rendering.
//!
//! Every user-visible failure carries the request's correlation id:
//!
//! ```text
//! { "error": "...", "code": "..." | null, "details": [...] | null, "requestId": "..." }
//! ```

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::request::RequestId;
use crate::http::response::json_with_request_id;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error body without its correlation id; see [`json_with_request_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: Option<String>,
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// `POST` without an `Idempotency-Key` header.
    #[error("idempotency key header is required")]
    IdempotencyKeyRequired,

    /// Business validation failed.
    #[error("request failed validation on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("product {0} not found")]
    ProductNotFound(String),

    /// Admission rejected by the rate limiter.
    #[error("too many requests, retry after {retry_after_secs}s")]
    TooManyRequests { retry_after_secs: u64 },

    /// Injected 503.
    #[error("service unavailable")]
    Unavailable,

    /// Injected 500.
    #[error("unexpected failure")]
    Unexpected,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::IdempotencyKeyRequired | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, code, details) = match self {
            ApiError::IdempotencyKeyRequired => (
                "validation_error",
                Some("IDEMPOTENCY_KEY_REQUIRED"),
                Some(vec![FieldError::new("Idempotency-Key", "Header is required")]),
            ),
            ApiError::Validation(details) => (
                "validation_error",
                Some("VALIDATION_FAILED"),
                Some(details.clone()),
            ),
            ApiError::ProductNotFound(_) => ("not_found", Some("PRODUCT_NOT_FOUND"), None),
            ApiError::TooManyRequests { .. } => ("too_many_requests", None, None),
            ApiError::Unavailable => ("unavailable", None, None),
            ApiError::Unexpected => ("unexpected", None, None),
        };

        ErrorBody {
            error: error.to_string(),
            code: code.map(str::to_string),
            details,
        }
    }

    /// Render as a JSON response stamped with `request_id`.
    pub fn respond(&self, request_id: &RequestId) -> Response {
        let body = serde_json::to_value(self.body()).unwrap_or_default();
        let mut response = json_with_request_id(self.status(), body, request_id);

        if let ApiError::TooManyRequests { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        }
        response
    }
}
