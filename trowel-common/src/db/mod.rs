//! Persisted store connection setup

pub mod init;

pub use init::init_pool;
