//! # mjlog-crawler Domain Layer
//!
//! This crate contains the crawl pipeline of mjlog-crawler and the contracts of
//! everything it talks to. It follows hexagonal architecture principles:
//!
//! - **Entities**: `ItemId`, `Outcome`, `RunReport`, `GameSummary`
//! - **Ports**: `StorageRepository`, `LogSource`, `Summarizer`, `Notifier`
//! - **Services**: `IngestionPipeline`, the concurrent discover/ingest loop
//!
//! ## Architecture
//!
//! This layer has NO dependencies on infrastructure concerns (HTTP, S3,
//! filesystem). Adapters live in their own crates and implement the ports.
//!
//! ## Example
//!
//! ```rust
//! use mjlog_domain::ingestion::{IngestionPipeline, PipelineError};
//! use mjlog_domain::ports::{LogSource, Notifier, StorageRepository, Summarizer};
//!
//! async fn crawl<S, F, Z, N>(pipeline: IngestionPipeline<S, F, Z, N>)
//! where
//!     S: StorageRepository + 'static,
//!     F: LogSource + 'static,
//!     Z: Summarizer + 'static,
//!     N: Notifier + 'static,
//! {
//!     match pipeline.run().await {
//!         Ok(report) => println!("ingested {} logs", report.ingested),
//!         Err(PipelineError::ItemsFailed(err)) => println!("{}", err),
//!         Err(err) => println!("crawl aborted: {}", err),
//!     }
//! }
//! ```

pub mod ingestion;
pub mod ports;

// Re-export commonly used types
pub use ingestion::{IngestionPipeline, ItemId, PipelineConfig, PipelineError, RunReport};
pub use ports::{LogSource, Notifier, StorageRepository, Summarizer};
