//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderMap, response::Response, Router};
use tokio::net::TcpListener;

use resilient_api::config::ServerConfig;
use resilient_api::http::AppState;
use resilient_api::sources::{Clock, RandomSource, SequenceRandom, SystemClock};
use resilient_api::{HttpServer, ResilienceConfig, Shutdown};

/// Start a programmable backend on an ephemeral port.
///
/// `f` sees every request's headers and decides the response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(HeaderMap) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let app = Router::new().fallback(move |headers: HeaderMap| {
        let f = f.clone();
        async move { f(headers).await }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config with fault injection off and a generous rate limit.
pub fn quiet_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.fault_injection.enabled = false;
    config.rate_limit.max_requests = 1_000;
    config
}

/// Build a server with pinned sources, without binding it.
pub fn build_server(
    config: ServerConfig,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
) -> HttpServer {
    HttpServer::with_sources(config, clock, random)
}

/// A running server on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
}

impl RunningServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_server(config: ServerConfig, random: Arc<dyn RandomSource>) -> RunningServer {
    let server = build_server(config, Arc::new(SystemClock), random);
    let state = server.state().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningServer {
        addr,
        state,
        shutdown,
    }
}

/// Random source that always lands in the pass-through band.
pub fn passthrough_random() -> Arc<dyn RandomSource> {
    Arc::new(SequenceRandom::constant(0.5))
}

/// Client options with tiny, deterministic backoff.
pub fn fast_retries(retries: u32) -> ResilienceConfig {
    ResilienceConfig {
        retries,
        base_delay_ms: 1,
        jitter: false,
        timeout_ms: 2_000,
        ..ResilienceConfig::default()
    }
}
