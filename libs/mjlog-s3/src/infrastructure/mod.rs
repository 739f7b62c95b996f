//! Infrastructure adapters backed by S3

mod s3_storage;

pub use s3_storage::{S3Storage, LOG_EXTENSION};
