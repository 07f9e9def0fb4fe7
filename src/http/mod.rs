//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, header names)
//!     → rate limit → fault injection → product handlers
//!     → response.rs (JSON bodies stamped with requestId)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, IDEMPOTENCY_KEY, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
