//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (already tagged with X-Request-Id):
//!     → rate_limit.rs (per-client fixed window)
//!     → fault injection, then handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: rejected requests never reach business logic
//! - No trust in client input beyond the forwarded-for identity
//! - State is process-local; several processes each count independently

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, Admission, RateLimiter, RateWindow};
