//! Persisted store access
//!
//! The target table name comes from configuration and is checked as a plain
//! identifier before it is interpolated into SQL.

pub mod records;

pub use records::{count_rows, ensure_table, insert_batch, load_existing_keys};
