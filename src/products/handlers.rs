//! HTTP handlers for the product routes and the liveness probe.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::request::{RequestId, IDEMPOTENCY_KEY};
use crate::http::server::AppState;
use crate::products::types::validate_new_product;

/// `POST /products`: idempotent create.
pub async fn create_product(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = headers.get(IDEMPOTENCY_KEY).and_then(|v| v.to_str().ok());
    let products = state.products.clone();

    let handled = state.idempotency.handle(
        key,
        body,
        |raw| validate_new_product(&raw),
        |new| {
            let product = products.create(new);
            tracing::info!(request_id = %request_id, product_id = %product.id, "Product created");
            (
                StatusCode::CREATED,
                serde_json::to_value(product).unwrap_or(Value::Null),
            )
        },
    );

    match handled {
        Ok(handled) => {
            if handled.replayed {
                tracing::info!(
                    request_id = %request_id,
                    idempotency_key = %handled.record.key,
                    status = handled.record.status.as_u16(),
                    "Replaying idempotent response"
                );
            }
            handled.record.render(&request_id)
        }
        Err(err) => {
            tracing::debug!(request_id = %request_id, error = %err, "Rejected create");
            err.respond(&request_id)
        }
    }
}

/// `GET /products`
pub async fn list_products(State(state): State<AppState>) -> Response {
    Json(state.products.list()).into_response()
}

/// `GET /products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(id): Path<String>,
) -> Response {
    match state.products.get(&id) {
        Some(product) => Json(product).into_response(),
        None => ApiError::ProductNotFound(id).respond(&request_id),
    }
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
