//! Infrastructure adapters backed by the local filesystem

mod local_storage;

pub use local_storage::{LocalStorage, DEFAULT_BASE_DIR, LOG_EXTENSION};
