//! Ports (trait definitions) for external dependencies
//!
//! The pipeline only talks to the outside world through these four traits.
//! Adapters live in their own crates (local disk, S3, Tenhou HTTP, webhook).
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` so the pipeline is monomorphized over its adapters.
//!
//! ## Concurrency
//!
//! All ports are shared by every worker of a run at the same time, hence the
//! `Send + Sync` bounds. Implementations must not keep run-scoped mutable state.

use std::future::Future;

use crate::ingestion::{
    FetchError, GameSummary, ItemId, NotifyError, StorageError, SummarizeError,
};

/// Port for persisting raw logs
///
/// The storage is the only durable state of the crawler: an item is considered
/// ingested once `exists` reports it, across runs and process restarts.
pub trait StorageRepository: Send + Sync {
    /// Canonical storage path (or key) for an item
    fn path_for(&self, id: &ItemId) -> String;

    /// Check whether something is already stored at `path`
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot answer. A failed check must
    /// never be interpreted as "exists".
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Store `data` at `path`
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bytes were not durably written.
    fn save(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Port for discovering and downloading logs
pub trait LogSource: Send + Sync {
    /// List the ids of every log currently offered for the configured user
    ///
    /// Called exactly once per run.
    fn list_candidates(&self) -> impl Future<Output = Result<Vec<ItemId>, FetchError>> + Send;

    /// Download the raw bytes of one log
    fn fetch(&self, id: &ItemId) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Port for extracting a summary out of raw log bytes
///
/// Summarizing is pure CPU work, so this port is synchronous.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, data: &[u8]) -> Result<GameSummary, SummarizeError>;
}

/// Port for announcing newly ingested logs
pub trait Notifier: Send + Sync {
    /// Post a plain-text message
    ///
    /// An unconfigured channel must succeed without doing anything.
    fn notify(&self, message: &str) -> impl Future<Output = Result<(), NotifyError>> + Send;
}
