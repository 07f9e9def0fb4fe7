//! Product catalogue: the business collaborator behind the pipeline.
//!
//! # Data Flow
//! ```text
//! POST /products
//!     → handlers.rs (Idempotency-Key, request id)
//!     → idempotency store (replay or run once)
//!         → types.rs (validate body into NewProduct)
//!         → store.rs (assign id, timestamps, insert)
//! GET /products, GET /products/{id}
//!     → store.rs (read-only)
//! ```

pub mod handlers;
pub mod store;
pub mod types;

pub use store::ProductStore;
pub use types::{validate_new_product, NewProduct, Product};
