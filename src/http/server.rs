//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the request pipeline (trace, request ID, timeout, body limit,
//!   metrics, rate limit, fault injection)
//! - Own the process-wide state (products, idempotency records, rate windows)
//! - Bind server to listener and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::idempotency::IdempotencyStore;
use crate::observability::metrics;
use crate::products::handlers::{create_product, get_product, health, list_products};
use crate::products::ProductStore;
use crate::resilience::faults::{fault_injection_middleware, FaultInjector};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::sources::{Clock, RandomSource, SystemClock, ThreadRandom};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<ProductStore>,
    pub idempotency: Arc<IdempotencyStore>,
}

/// HTTP server for the product API.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    state: AppState,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server with the system clock and thread RNG.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_sources(config, Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    /// Create a server whose time and randomness come from the given sources.
    pub fn with_sources(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let state = AppState {
            products: Arc::new(ProductStore::new(clock.clone())),
            idempotency: Arc::new(IdempotencyStore::new()),
        };
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), clock));
        let fault_injector = Arc::new(FaultInjector::new(config.fault_injection.clone(), random));

        let router =
            Self::build_router(&config, state.clone(), rate_limiter.clone(), fault_injector);
        Self {
            router,
            config,
            state,
            rate_limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers are listed innermost first; a request meets them bottom-up.
    #[allow(deprecated)]
    fn build_router(
        config: &ServerConfig,
        state: AppState,
        rate_limiter: Arc<RateLimiter>,
        fault_injector: Arc<FaultInjector>,
    ) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/products", post(create_product).get(list_products))
            .route("/products/{id}", get(get_product))
            .with_state(state)
            .layer(middleware::from_fn_with_state(fault_injector, fault_injection_middleware))
            .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.config.rate_limit.enabled,
            fault_injection = self.config.fault_injection.enabled,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
