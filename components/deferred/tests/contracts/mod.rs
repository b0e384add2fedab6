//! Contract tests for the deferred crate
//! This file makes cargo test discover the contract test modules
