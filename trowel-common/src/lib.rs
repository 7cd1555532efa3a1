//! # trowel common library
//!
//! Shared infrastructure for the trowel crates:
//! - Error type and result alias
//! - Configuration loading (defaults, TOML, environment, CLI overrides)
//! - Store connection setup

pub mod config;
pub mod db;
pub mod error;

pub use config::IngestConfig;
pub use error::{Error, Result};
