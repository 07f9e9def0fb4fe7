//! Retry classification and per-call retry state.
//!
//! # Responsibilities
//! - Classify each attempt's outcome (rate limited, server error, transport, final)
//! - Track attempt number and remaining retry budget for one logical call
//! - Decide whether to retry and how long to wait first
//!
//! # Design Decisions
//! - 429 consumes budget but does not grow the backoff exponent
//! - 500/502/503/504, timeouts and transport errors share the backoff path
//! - Everything else, including other 4xx, is final on first sight

use std::time::Duration;

use axum::http::{header::RETRY_AFTER, HeaderMap, StatusCode};

use crate::resilience::backoff::calculate_backoff;
use crate::sources::RandomSource;

/// Wait applied to a 429 whose `Retry-After` is missing or unreadable.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_millis(1000);

/// Status codes treated as transient upstream failures.
pub const RETRYABLE_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// What a single attempt produced, as far as retrying is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 429 with the server-advertised wait.
    RateLimited { retry_after: Duration },
    /// One of [`RETRYABLE_STATUSES`].
    ServerError(StatusCode),
    /// Connection failure, protocol error or per-attempt timeout.
    TransportFailure,
    /// Anything else; returned to the caller as-is.
    Final,
}

impl Outcome {
    /// Label used for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Outcome::RateLimited { .. } => "rate_limited",
            Outcome::ServerError(_) => "server_error",
            Outcome::TransportFailure => "transport",
            Outcome::Final => "final",
        }
    }
}

/// Classify a received response.
pub fn classify_response(status: StatusCode, headers: &HeaderMap) -> Outcome {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Outcome::RateLimited {
            retry_after: parse_retry_after(headers),
        }
    } else if RETRYABLE_STATUSES.contains(&status) {
        Outcome::ServerError(status)
    } else {
        Outcome::Final
    }
}

/// Read `Retry-After` as (possibly fractional) seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Mutable retry bookkeeping owned by exactly one in-flight call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    retries_remaining: u32,
    attempts_made: u32,
    request_id: String,
}

impl RetryState {
    pub fn new(retries: u32, request_id: impl Into<String>) -> Self {
        Self {
            attempt: 0,
            retries_remaining: retries,
            attempts_made: 0,
            request_id: request_id.into(),
        }
    }

    /// Backoff exponent for the next server-error or transport retry.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    /// Physical attempts started so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Mark the start of a physical attempt.
    pub fn begin_attempt(&mut self) {
        self.attempts_made += 1;
    }

    /// Decide what follows `outcome`. `Some(delay)` means wait then retry.
    pub fn next_delay(
        &mut self,
        outcome: &Outcome,
        base_delay_ms: u64,
        jitter: bool,
        random: &dyn RandomSource,
    ) -> Option<Duration> {
        if self.retries_remaining == 0 {
            return None;
        }

        let delay = match outcome {
            Outcome::Final => return None,
            Outcome::RateLimited { retry_after } => *retry_after,
            Outcome::ServerError(_) | Outcome::TransportFailure => {
                let delay = calculate_backoff(base_delay_ms, self.attempt, jitter, random);
                self.attempt += 1;
                delay
            }
        };

        self.retries_remaining -= 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SequenceRandom;
    use axum::http::HeaderValue;

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_classification() {
        let empty = HeaderMap::new();
        assert_eq!(
            classify_response(StatusCode::SERVICE_UNAVAILABLE, &empty),
            Outcome::ServerError(StatusCode::SERVICE_UNAVAILABLE)
        );
        assert_eq!(
            classify_response(StatusCode::GATEWAY_TIMEOUT, &empty),
            Outcome::ServerError(StatusCode::GATEWAY_TIMEOUT)
        );
        assert_eq!(classify_response(StatusCode::NOT_IMPLEMENTED, &empty), Outcome::Final);
        assert_eq!(classify_response(StatusCode::BAD_REQUEST, &empty), Outcome::Final);
        assert_eq!(classify_response(StatusCode::CREATED, &empty), Outcome::Final);
        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, &headers_with_retry_after("2")),
            Outcome::RateLimited { retry_after: Duration::from_secs(2) }
        );
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("soon")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("-3")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("1e20")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("inf")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("NaN")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers_with_retry_after("0")), Duration::ZERO);
        assert_eq!(
            parse_retry_after(&headers_with_retry_after("1.5")),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_server_errors_grow_backoff_and_spend_budget() {
        let rng = SequenceRandom::constant(0.0);
        let mut state = RetryState::new(2, "rid");
        let outcome = Outcome::ServerError(StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(state.next_delay(&outcome, 250, false, &rng), Some(Duration::from_millis(250)));
        assert_eq!((state.attempt(), state.retries_remaining()), (1, 1));

        assert_eq!(
            state.next_delay(&Outcome::TransportFailure, 250, false, &rng),
            Some(Duration::from_millis(500))
        );
        assert_eq!((state.attempt(), state.retries_remaining()), (2, 0));

        assert_eq!(state.next_delay(&outcome, 250, false, &rng), None);
        assert_eq!((state.attempt(), state.retries_remaining()), (2, 0));
    }

    #[test]
    fn test_rate_limit_does_not_increment_attempt() {
        let rng = SequenceRandom::constant(0.0);
        let mut state = RetryState::new(3, "rid");
        let limited = Outcome::RateLimited { retry_after: Duration::from_secs(2) };

        assert_eq!(state.next_delay(&limited, 250, true, &rng), Some(Duration::from_secs(2)));
        assert_eq!((state.attempt(), state.retries_remaining()), (0, 2));

        // The next server error still starts from the base delay.
        let server = Outcome::ServerError(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.next_delay(&server, 250, false, &rng), Some(Duration::from_millis(250)));
        assert_eq!((state.attempt(), state.retries_remaining()), (1, 1));
    }

    #[test]
    fn test_final_outcome_never_retries() {
        let rng = SequenceRandom::constant(0.0);
        let mut state = RetryState::new(5, "rid");
        assert_eq!(state.next_delay(&Outcome::Final, 250, true, &rng), None);
        assert_eq!(state.retries_remaining(), 5);
    }

    #[test]
    fn test_zero_budget_means_single_attempt() {
        let rng = SequenceRandom::constant(0.0);
        let mut state = RetryState::new(0, "rid");
        state.begin_attempt();
        assert_eq!(state.next_delay(&Outcome::TransportFailure, 1, false, &rng), None);
        assert_eq!(state.attempts_made(), 1);
        assert_eq!(state.request_id(), "rid");
    }
}
