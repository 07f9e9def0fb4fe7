//! Process-wide idempotency cache.

use axum::{http::StatusCode, response::Response};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::request::RequestId;
use crate::http::response::json_with_request_id;
use crate::observability::metrics;

/// Cached outcome of the first request seen for a key.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub key: String,
    pub status: StatusCode,
    /// Response body without `requestId`.
    pub body: Value,
}

impl IdempotencyRecord {
    /// Render the stored response for the current request.
    pub fn render(&self, request_id: &RequestId) -> Response {
        json_with_request_id(self.status, self.body.clone(), request_id)
    }
}

/// Outcome of [`IdempotencyStore::handle`].
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
    pub record: IdempotencyRecord,
    /// `true` when served from cache without running the operation.
    pub replayed: bool,
}

/// Map from idempotency key to its terminal record.
#[derive(Debug, Default)]
pub struct IdempotencyStore {
    records: DashMap<String, IdempotencyRecord>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<IdempotencyRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Run `operation` at most once per key.
    ///
    /// 1. No key: [`ApiError::IdempotencyKeyRequired`], nothing cached.
    /// 2. Cached key: the stored record, operation not called.
    /// 3. `validate` fails: the failure is cached and returned.
    /// 4. Otherwise `operation` runs once and its result is cached.
    ///
    /// Both closures run while the key's entry is locked; they must not touch
    /// this store.
    pub fn handle<B, T, V, O>(
        &self,
        key: Option<&str>,
        body: B,
        validate: V,
        operation: O,
    ) -> Result<Handled, ApiError>
    where
        V: FnOnce(B) -> Result<T, ApiError>,
        O: FnOnce(T) -> (StatusCode, Value),
    {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::IdempotencyKeyRequired)?;

        match self.records.entry(key.to_string()) {
            Entry::Occupied(cached) => {
                metrics::record_idempotency("replayed");
                Ok(Handled {
                    record: cached.get().clone(),
                    replayed: true,
                })
            }
            Entry::Vacant(slot) => {
                let (status, body) = match validate(body) {
                    Ok(input) => operation(input),
                    Err(err) => (
                        err.status(),
                        serde_json::to_value(err.body()).unwrap_or_default(),
                    ),
                };
                let record = IdempotencyRecord {
                    key: key.to_string(),
                    status,
                    body,
                };
                slot.insert(record.clone());
                metrics::record_idempotency("fresh");
                Ok(Handled {
                    record,
                    replayed: false,
                })
            }
        }
    }
}
