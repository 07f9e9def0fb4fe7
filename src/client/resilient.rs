//! HTTP client with per-attempt timeouts, retries and backoff.
//!
//! # Outcome handling
//! ```text
//! 429                  → wait Retry-After (default 1s), retry; backoff exponent unchanged
//! 500 / 502 / 503 / 504 → wait base * 2^attempt (+ jitter), retry; exponent + 1
//! transport / timeout  → same as 5xx
//! anything else        → return immediately
//! ```
//!
//! At most `retries + 1` attempts per call. When the budget runs out the last
//! response (or error) is returned as-is.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{HeaderName, InvalidHeaderValue, CONTENT_TYPE},
    HeaderMap, HeaderValue, Method,
};
use bytes::Bytes;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::client::idempotency::KeyError;
use crate::http::request::{IDEMPOTENCY_KEY, X_REQUEST_ID};
use crate::observability::metrics;
use crate::resilience::retries::{classify_response, Outcome, RetryState};
use crate::sources::{RandomSource, ThreadRandom};

/// Per-call resilience options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResilienceConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Backoff base in milliseconds.
    pub base_delay_ms: u64,
    /// Add `[0, 100)` ms of jitter to each backoff.
    pub jitter: bool,
    /// Deadline for each attempt in milliseconds.
    pub timeout_ms: u64,
    pub idempotency_key: Option<String>,
    /// Correlation id shared by every attempt; generated when absent.
    pub request_id: Option<String>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay_ms: 250,
            jitter: true,
            timeout_ms: 3000,
            idempotency_key: None,
            request_id: None,
        }
    }
}

/// Method, headers and body of a request, reusable across attempts.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestSpec {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// `POST` with `value` serialized as the JSON body.
    pub fn post_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: Some(Bytes::from(serde_json::to_vec(value)?)),
            ..Self::new(Method::POST)
        })
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request {request_id} failed after {attempts} attempt(s): {source}")]
    Transport {
        request_id: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("request {request_id} timed out after {timeout_ms}ms (attempt {attempts})")]
    Timeout {
        request_id: String,
        attempts: u32,
        timeout_ms: u64,
    },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid value for header {name}")]
    InvalidHeader {
        name: HeaderName,
        #[source]
        source: InvalidHeaderValue,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to read response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("could not derive idempotency key: {0}")]
    IdempotencyKey(#[from] KeyError),
}

impl ClientError {
    /// Attempts made before giving up, for transport and timeout failures.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::Transport { attempts, .. } | ClientError::Timeout { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }
}

/// Why a single attempt produced no response.
#[derive(Debug)]
enum AttemptError {
    Transport(reqwest::Error),
    Timeout,
}

impl AttemptError {
    fn into_client_error(self, state: &RetryState, timeout_ms: u64) -> ClientError {
        match self {
            AttemptError::Transport(source) => ClientError::Transport {
                request_id: state.request_id().to_string(),
                attempts: state.attempts_made(),
                source,
            },
            AttemptError::Timeout => ClientError::Timeout {
                request_id: state.request_id().to_string(),
                attempts: state.attempts_made(),
                timeout_ms,
            },
        }
    }
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|source| ClientError::InvalidHeader {
        name: name.clone(),
        source,
    })
}

/// Caller headers plus content type, idempotency key and request id.
fn prepare_headers(
    base: &HeaderMap,
    idempotency_key: Option<&str>,
    request_id: &str,
) -> Result<HeaderMap, ClientError> {
    let mut headers = base.clone();
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    if let Some(key) = idempotency_key {
        headers.insert(IDEMPOTENCY_KEY, header_value(&IDEMPOTENCY_KEY, key)?);
    }
    headers.insert(X_REQUEST_ID, header_value(&X_REQUEST_ID, request_id)?);
    Ok(headers)
}

/// Stateless across calls; cheap to clone.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    http: reqwest::Client,
    random: Arc<dyn RandomSource>,
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientClient {
    pub fn new() -> Self {
        Self::with_parts(reqwest::Client::new(), Arc::new(ThreadRandom))
    }

    /// Use a specific HTTP client and jitter source.
    pub fn with_parts(http: reqwest::Client, random: Arc<dyn RandomSource>) -> Self {
        Self { http, random }
    }

    /// Send `spec` to `url`, retrying per `config`.
    pub async fn send(
        &self,
        url: &str,
        spec: &RequestSpec,
        config: &ResilienceConfig,
    ) -> Result<Response, ClientError> {
        let url = Url::parse(url)?;
        let request_id = config
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let headers =
            prepare_headers(&spec.headers, config.idempotency_key.as_deref(), &request_id)?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let mut state = RetryState::new(config.retries, request_id);

        loop {
            state.begin_attempt();

            let mut request = self
                .http
                .request(spec.method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(body) = &spec.body {
                request = request.body(body.clone());
            }

            // Dropping the future on timeout aborts the attempt and its timer.
            let result = match tokio::time::timeout(timeout, request.send()).await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(AttemptError::Transport(e)),
                Err(_) => Err(AttemptError::Timeout),
            };

            let outcome = match &result {
                Ok(response) => classify_response(response.status(), response.headers()),
                Err(_) => Outcome::TransportFailure,
            };

            let delay = state.next_delay(
                &outcome,
                config.base_delay_ms,
                config.jitter,
                self.random.as_ref(),
            );

            let Some(delay) = delay else {
                if outcome != Outcome::Final {
                    tracing::warn!(
                        request_id = %state.request_id(),
                        attempts = state.attempts_made(),
                        reason = outcome.reason(),
                        "Retries exhausted"
                    );
                }
                return result.map_err(|e| e.into_client_error(&state, config.timeout_ms));
            };

            match &result {
                Ok(response) => tracing::warn!(
                    request_id = %state.request_id(),
                    attempt = state.attempts_made(),
                    status = response.status().as_u16(),
                    retries_remaining = state.retries_remaining(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request"
                ),
                Err(e) => tracing::warn!(
                    request_id = %state.request_id(),
                    attempt = state.attempts_made(),
                    error = ?e,
                    retries_remaining = state.retries_remaining(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transport failure"
                ),
            }
            metrics::record_client_retry(outcome.reason());

            drop(result);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResilienceConfig::default();
        assert_eq!(config.retries, 2);
        assert_eq!(config.base_delay_ms, 250);
        assert!(config.jitter);
        assert_eq!(config.timeout_ms, 3000);
    }

    #[test]
    fn test_config_from_camel_case_json() {
        let config: ResilienceConfig =
            serde_json::from_str(r#"{"retries": 5, "baseDelayMs": 10, "idempotencyKey": "k"}"#)
                .unwrap();
        assert_eq!(config.retries, 5);
        assert_eq!(config.base_delay_ms, 10);
        assert_eq!(config.timeout_ms, 3000);
        assert_eq!(config.idempotency_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_prepare_headers_defaults_content_type() {
        let headers = prepare_headers(&HeaderMap::new(), Some("key-1"), "rid-1").unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[IDEMPOTENCY_KEY], "key-1");
        assert_eq!(headers[X_REQUEST_ID], "rid-1");
    }

    #[test]
    fn test_prepare_headers_keeps_caller_content_type() {
        let mut base = HeaderMap::new();
        base.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let headers = prepare_headers(&base, None, "rid").unwrap();
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert!(!headers.contains_key(IDEMPOTENCY_KEY));
    }

    #[test]
    fn test_prepare_headers_rejects_bad_key() {
        let err = prepare_headers(&HeaderMap::new(), Some("bad\nkey"), "rid").unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidHeader { ref name, .. } if *name == IDEMPOTENCY_KEY
        ));
    }

    #[test]
    fn test_post_json_spec() {
        let spec = RequestSpec::post_json(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.body.as_deref(), Some(&b"{\"a\":1}"[..]));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_any_attempt() {
        let err = ResilientClient::new()
            .send("not a url", &RequestSpec::get(), &ResilienceConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Url(_)));
        assert_eq!(err.attempts(), None);
    }
}
