//! Test Helper Utilities
//!
//! Shared utilities for trowel-ingest integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod mock_api;

pub use db_utils::{create_test_db, test_config};
pub use mock_api::{history_items, MockApi};
