//! Lifecycle management.
//!
//! Startup is linear in `main`: config → logging → metrics → bind → serve.
//! Shutdown: Ctrl+C → [`Shutdown::trigger`] → stop accepting → drain → exit.

pub mod shutdown;

pub use shutdown::Shutdown;
