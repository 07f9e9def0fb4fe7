//! Probabilistic fault and latency injection.
//!
//! # Responsibilities
//! - Draw once per request and decide: pass, slow down, or fail
//! - Sleep for the slow path, short-circuit with 503/500 for the failure path
//!
//! # Design Decisions
//! - The draw ignores `Idempotency-Key`; replays see the same odds as fresh calls
//! - Slow and failure bands never overlap (slow < threshold < failure)
//! - Runs after the rate limiter, before any business handler

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::FaultInjectionConfig;
use crate::error::ApiError;
use crate::http::request::RequestId;
use crate::observability::metrics;
use crate::sources::RandomSource;

/// What the injector does to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Forward unchanged.
    Pass,
    /// Sleep, then forward.
    Delay(Duration),
    /// Answer 503 `unavailable` without forwarding.
    Unavailable,
    /// Answer 500 `unexpected` without forwarding.
    Unexpected,
}

/// Fault injector state shared by the middleware.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    config: FaultInjectionConfig,
    random: Arc<dyn RandomSource>,
}

impl FaultInjector {
    pub fn new(config: FaultInjectionConfig, random: Arc<dyn RandomSource>) -> Self {
        Self { config, random }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Pick the fault for the next request.
    pub fn decide(&self) -> Fault {
        if !self.config.enabled {
            return Fault::Pass;
        }

        let r = self.random.next_f64();
        if r < self.config.slow_probability {
            let span = self.config.slow_max_ms.saturating_sub(self.config.slow_min_ms);
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let extra = (self.random.next_f64() * span as f64) as u64;
            Fault::Delay(Duration::from_millis(self.config.slow_min_ms + extra))
        } else if r > self.config.failure_threshold {
            if self.random.next_f64() < self.config.unavailable_ratio {
                Fault::Unavailable
            } else {
                Fault::Unexpected
            }
        } else {
            Fault::Pass
        }
    }
}

/// Middleware applying [`FaultInjector::decide`] to every request.
pub async fn fault_injection_middleware(
    State(injector): State<Arc<FaultInjector>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::from_extensions(request.extensions());

    match injector.decide() {
        Fault::Pass => next.run(request).await,
        Fault::Delay(delay) => {
            tracing::debug!(
                request_id = %request_id,
                delay_ms = delay.as_millis() as u64,
                "Injecting latency"
            );
            metrics::record_fault_injected("latency");
            tokio::time::sleep(delay).await;
            next.run(request).await
        }
        Fault::Unavailable => {
            tracing::debug!(request_id = %request_id, "Injecting 503");
            metrics::record_fault_injected("unavailable");
            ApiError::Unavailable.respond(&request_id)
        }
        Fault::Unexpected => {
            tracing::debug!(request_id = %request_id, "Injecting 500");
            metrics::record_fault_injected("unexpected");
            ApiError::Unexpected.respond(&request_id)
        }
    }
}
