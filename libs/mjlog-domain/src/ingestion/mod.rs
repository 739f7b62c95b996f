//! Ingestion domain module
//!
//! This module contains the crawl pipeline, the entities it produces and the
//! errors it reports.

pub mod entity;
pub mod error;
pub mod ids;
pub mod service;

pub use entity::{GameSummary, Outcome, RunReport, Standing};
pub use error::{
    AggregateError, FetchError, ItemError, NotifyError, PipelineError, Result, Stage,
    StorageError, SummarizeError,
};
pub use ids::{ItemId, RunId};
pub use service::{
    IngestionPipeline, PipelineConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_REPLAY_URL_PREFIX,
    DEFAULT_WORKERS,
};
