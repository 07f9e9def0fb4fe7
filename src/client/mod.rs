//! Client side of the resilient request/response layer.
//!
//! # Data Flow
//! ```text
//! caller payload
//!     → idempotency.rs (content hash → stable Idempotency-Key)
//!     → resilient.rs (headers, per-attempt timeout, retry loop)
//!     → [network]
//!     → products.rs (typed calls, JSON replies)
//! ```
//!
//! # Design Decisions
//! - Attempts of one call are strictly sequential
//! - Retries reuse the same X-Request-Id and Idempotency-Key
//! - The final outcome is surfaced unchanged once the budget is spent

pub mod idempotency;
pub mod products;
pub mod resilient;

pub use idempotency::{FileKeyIndex, IdempotencyKeyManager, KeyError, KeyIndex, MemoryKeyIndex};
pub use products::{ApiReply, ProductsClient};
pub use resilient::{ClientError, RequestSpec, ResilienceConfig, ResilientClient};
