//! Idempotent request handling.
//!
//! # State Machine (per key)
//! ```text
//! Unseen ──first handled request──▶ Cached(status, body)   (terminal)
//! ```
//!
//! # Design Decisions
//! - Validation failures are cached too, so a repeated key never re-validates
//!   differently. Most systems cache successes only; this one deliberately
//!   does not.
//! - Check, validate, execute and insert happen under the key's map-entry
//!   lock, so one process never runs the operation twice for a key. Several
//!   processes need a shared atomic check-and-set store instead.
//! - Records live for the process lifetime; there is no expiry.

pub mod store;

pub use store::{Handled, IdempotencyRecord, IdempotencyStore};
