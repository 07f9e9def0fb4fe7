//! Response shaping.
//!
//! # Responsibilities
//! - Serialize JSON bodies with the request's correlation id attached
//!
//! # Design Decisions
//! - `requestId` is added at render time, never stored, so replayed bodies
//!   differ from the original only in that field
//! - `X-Request-Id` response header is set by the propagate layer, not here

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::http::request::RequestId;

/// Field name carrying the correlation id inside JSON bodies.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Insert `requestId` into an object body (replacing any stored one).
pub fn with_request_id(mut body: Value, request_id: &RequestId) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert(
            REQUEST_ID_FIELD.to_string(),
            Value::String(request_id.as_str().to_string()),
        );
    }
    body
}

/// Build a JSON response whose object body carries `requestId`.
pub fn json_with_request_id(status: StatusCode, body: Value, request_id: &RequestId) -> Response {
    (status, Json(with_request_id(body, request_id))).into_response()
}
