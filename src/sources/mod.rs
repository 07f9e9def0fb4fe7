//! Injectable sources of time and randomness.
//!
//! # Responsibilities
//! - Give the rate limiter and product store a wall clock they can share
//! - Give backoff jitter and fault injection a random source they can share
//!
//! # Design Decisions
//! - Both are trait objects held in `Arc`, so tests swap in scripted versions
//! - Production implementations are zero-sized and cheap to clone

pub mod clock;
pub mod random;

pub use clock::{Clock, ManualClock, SystemClock};
pub use random::{RandomSource, SequenceRandom, ThreadRandom};
