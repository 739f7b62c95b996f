//! # mjlog-crawler S3 Adapter
//!
//! Implements the `StorageRepository` port on top of AWS S3 or an
//! S3-compatible store (MinIO).

pub mod infrastructure;

pub use infrastructure::S3Storage;
