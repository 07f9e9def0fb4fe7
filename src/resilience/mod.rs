//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Client side, per logical call:
//!     → retries.rs (classify outcome, spend budget)
//!     → backoff.rs (exponential delay + jitter for 5xx / transport)
//!     → sleep, next attempt (strictly sequential)
//!
//! Server side, per request:
//!     → faults.rs (optionally slow down or fail before business logic)
//! ```
//!
//! # Design Decisions
//! - Retry state is an explicit loop variable, never recursion
//! - Every attempt has its own deadline
//! - Randomness is injected so tests can pin jitter and faults

pub mod backoff;
pub mod faults;
pub mod retries;

pub use backoff::calculate_backoff;
pub use faults::{Fault, FaultInjector};
pub use retries::{classify_response, Outcome, RetryState};
