//! Test helpers for gauntlet-fixtures tests.
//!
//! This module provides a recording mock database and utility functions for
//! loading test data.

#![allow(dead_code)]

#[path = "helpers/mock_db.rs"]
pub mod mock_db;
#[path = "helpers/test_data.rs"]
pub mod test_data;

/// Routes `tracing` output through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}
