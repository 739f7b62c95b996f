//! # mjlog-crawler Local Adapter
//!
//! Implements the `StorageRepository` port on the local filesystem.

pub mod infrastructure;

pub use infrastructure::LocalStorage;
