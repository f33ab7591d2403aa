//! Shared utilities.
//!
//! Tracing bootstrap, retry backoff policies and periodic background tasks.

pub mod bootstrap;
pub mod periodic;
pub mod retry;
