//! Request correlation.
//!
//! # Responsibilities
//! - Name the headers the pipeline reads (`X-Request-Id`, `Idempotency-Key`)
//! - Expose the request id assigned by the request-id layer to handlers and middleware
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (outermost layer but one)
//! - Caller-supplied ids are kept verbatim so client retries correlate

use std::convert::Infallible;
use std::fmt;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Extensions, HeaderName},
};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Correlation id of the request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Read the id set by `SetRequestIdLayer`, or mint one if the layer is absent.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions
            .get::<tower_http::request_id::RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .map(Self::new)
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}
