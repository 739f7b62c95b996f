//! Domain errors for the crawl pipeline
//!
//! Port errors (`FetchError`, `StorageError`, `SummarizeError`, `NotifyError`) are
//! returned by adapters. The pipeline wraps them into `ItemError` for per-item
//! failures and into `PipelineError` for the outcome of a whole run.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::ingestion::ids::ItemId;

/// Errors raised by the log source while listing or downloading logs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or did not complete (connection, timeout)
    #[error("Request failed: {0}")]
    Request(String),

    /// The remote answered with an unexpected HTTP status
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The listing page could not be interpreted
    #[error("Invalid listing: {0}")]
    InvalidListing(String),
}

impl FetchError {
    /// Create a request error with a message
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create an unexpected status error
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Create a body read error with a message
    pub fn body(msg: impl Into<String>) -> Self {
        Self::Body(msg.into())
    }
}

/// Errors raised by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Failure reported by a remote backend
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The path is already taken and the backend refuses to overwrite it
    #[error("{0} already exists")]
    AlreadyExists(String),
}

impl StorageError {
    /// Create an I/O error with a message
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create a backend error with a message
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors raised while turning raw log bytes into a summary
///
/// `Decode` covers the transport encoding (compression), `Parse` covers the
/// structure of the log itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummarizeError {
    /// The bytes could not be decompressed or are not valid text
    #[error("Failed to decode log: {0}")]
    Decode(String),

    /// The log is readable but does not have the expected structure
    #[error("Failed to parse log: {0}")]
    Parse(String),
}

impl SummarizeError {
    /// Create a decode error with a message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a parse error with a message
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Errors raised by a notification channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The message could not be delivered
    #[error("Notification request failed: {0}")]
    Request(String),

    /// The channel answered with an unexpected HTTP status
    #[error("Notification rejected with status {status}")]
    Status { status: u16 },
}

impl NotifyError {
    /// Create a request error with a message
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }
}

/// Step of the per-item processing chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExistenceCheck,
    Fetch,
    Persist,
    Notify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ExistenceCheck => "existence check",
            Stage::Fetch => "fetch",
            Stage::Persist => "persist",
            Stage::Notify => "notify",
        };
        f.write_str(name)
    }
}

/// First failure encountered while processing one item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("Failed to check existence: {0}")]
    ExistenceCheck(StorageError),

    #[error("Failed to fetch log: {0}")]
    Fetch(FetchError),

    #[error("Failed to save log: {0}")]
    Persist(StorageError),

    #[error("Failed to summarize log: {0}")]
    Summarize(SummarizeError),

    #[error("Failed to notify: {0}")]
    Notify(NotifyError),

    /// A port call did not complete within the configured timeout
    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },

    /// Processing panicked; the worker survived and moved on
    #[error("Processing panicked: {0}")]
    Panicked(String),
}

impl ItemError {
    /// Create a timeout error for the given stage
    pub fn timeout(stage: Stage, timeout: Duration) -> Self {
        Self::Timeout { stage, timeout }
    }
}

/// The set of items that did not reach a successful terminal state in one run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to process the files ({})", join_ids(.failed))]
pub struct AggregateError {
    pub failed: Vec<ItemId>,
}

impl AggregateError {
    pub fn new(failed: Vec<ItemId>) -> Self {
        Self { failed }
    }

    /// Number of failed items
    pub fn len(&self) -> usize {
        self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether the given item is part of the failure set
    pub fn contains(&self, id: &ItemId) -> bool {
        self.failed.contains(id)
    }
}

/// Errors that end a pipeline run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The candidate listing could not be obtained; no item was processed
    #[error("Discovery failed: {0}")]
    Discovery(FetchError),

    /// The candidate listing did not complete within the configured timeout
    #[error("Discovery timed out after {0:?}")]
    DiscoveryTimeout(Duration),

    /// Discovery succeeded but some items failed
    #[error(transparent)]
    ItemsFailed(AggregateError),

    /// The run was cancelled before every candidate was processed
    #[error("Run cancelled ({} failed before cancellation)", .failed.len())]
    Cancelled { failed: Vec<ItemId> },
}

impl PipelineError {
    /// Whether the run stopped before enumerating any candidate
    pub fn is_discovery_failure(&self) -> bool {
        matches!(self, Self::Discovery(_) | Self::DiscoveryTimeout(_))
    }

    /// Items that failed during the run, empty for discovery failures
    pub fn failed_items(&self) -> &[ItemId] {
        match self {
            Self::ItemsFailed(aggregate) => &aggregate.failed,
            Self::Cancelled { failed } => failed,
            Self::Discovery(_) | Self::DiscoveryTimeout(_) => &[],
        }
    }
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ItemId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for pipeline runs
pub type Result<T> = std::result::Result<T, PipelineError>;
