//! Product API server.
//!
//! # Request Pipeline
//!
//! ```text
//!     Client ──▶ trace ──▶ X-Request-Id ──▶ timeout / body limit ──▶ metrics
//!                                                                     │
//!                                                                     ▼
//!                                                              rate limiter ──▶ 429 + Retry-After
//!                                                                     │
//!                                                                     ▼
//!                                                             fault injector ──▶ 503 / 500 / delay
//!                                                                     │
//!                                                                     ▼
//!                                                      idempotent handler ──▶ cached replay
//!                                                                     │
//!                                                                     ▼
//!                                                              product store
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use resilient_api::config::{load_config, ServerConfig};
use resilient_api::observability::{logging, metrics};
use resilient_api::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "resilient-api")]
#[command(
    about = "Product API with rate limiting, fault injection and idempotent replay",
    long_about = None
)]
struct Args {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("resilient-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        fault_injection = config.fault_injection.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
