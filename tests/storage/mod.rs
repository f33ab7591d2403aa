//! Shared storage integration tests.
//!
//! Tests the KeyValueStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod key_value_store_tests;
