//! Resilient request/response layer.
//!
//! Client side: a retrying HTTP client with backoff, per-attempt timeouts and
//! content-addressed idempotency keys. Server side: a product API behind a
//! pipeline of request-id tagging, rate limiting, fault injection and
//! idempotent replay.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod idempotency;
pub mod lifecycle;
pub mod observability;
pub mod products;
pub mod resilience;
pub mod security;
pub mod sources;

pub use client::{IdempotencyKeyManager, ProductsClient, ResilienceConfig, ResilientClient};
pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
