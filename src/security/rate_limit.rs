//! Per-client fixed-window rate limiting.
//!
//! # Algorithm
//! ```text
//! now - window_start <  window_ms  → count += 1
//! now - window_start >= window_ms  → count = 1, window_start = now
//! count > max_requests             → reject, Retry-After: retry_after_secs
//! ```
//!
//! The window resets on the first request after it elapses, so a client can
//! get up to `2 * max_requests` through across a boundary. Accepted.
//!
//! Windows that have elapsed are dropped whenever a new identity arrives, so
//! the map holds at most the identities seen within the last `window_ms`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::http::request::RequestId;
use crate::observability::metrics;
use crate::sources::Clock;

/// Identity used when neither a forwarded header nor a peer address is known.
pub const LOCAL_IDENTITY: &str = "local";

/// Counter for one client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_start_ms: u64,
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Reject { retry_after_secs: u64 },
}

/// Admission control state; one per server process.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Count one request from `identity` and decide whether to let it through.
    pub fn admit(&self, identity: &str) -> Admission {
        if !self.config.enabled {
            return Admission::Allow;
        }

        let now = self.clock.now_ms();
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        if !windows.contains_key(identity) {
            // Expired windows would reset on their next request anyway.
            let window_ms = self.config.window_ms;
            windows.retain(|_, w| now.saturating_sub(w.window_start_ms) < window_ms);
        }
        let window = windows.entry(identity.to_string()).or_insert(RateWindow {
            count: 0,
            window_start_ms: now,
        });

        if now.saturating_sub(window.window_start_ms) < self.config.window_ms {
            window.count = window.count.saturating_add(1);
        } else {
            *window = RateWindow {
                count: 1,
                window_start_ms: now,
            };
        }

        if window.count > self.config.max_requests {
            Admission::Reject {
                retry_after_secs: self.config.retry_after_secs,
            }
        } else {
            Admission::Allow
        }
    }

    /// Current window for `identity`, if any request has been seen.
    pub fn window(&self, identity: &str) -> Option<RateWindow> {
        self.windows
            .lock()
            .expect("rate limiter mutex poisoned")
            .get(identity)
            .copied()
    }
}

/// Derive the client identity: `X-Forwarded-For`, then peer IP, then [`LOCAL_IDENTITY`].
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| LOCAL_IDENTITY.to_string())
}

/// Middleware function for rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer);

    match limiter.admit(&identity) {
        Admission::Allow => next.run(request).await,
        Admission::Reject { retry_after_secs } => {
            let request_id = RequestId::from_extensions(request.extensions());
            tracing::warn!(request_id = %request_id, client = %identity, "Rate limit exceeded");
            metrics::record_rate_limited();
            ApiError::TooManyRequests { retry_after_secs }.respond(&request_id)
        }
    }
}
