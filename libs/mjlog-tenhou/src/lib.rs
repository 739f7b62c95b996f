//! # mjlog-crawler Tenhou Adapters
//!
//! - [`TenhouClient`]: `LogSource` port over the Tenhou log search pages
//! - [`MjlogSummarizer`]: `Summarizer` port reading final standings out of an mjlog

mod client;
mod summary;

pub use client::{ClientError, TenhouClient, TenhouConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use summary::{game_title, MjlogSummarizer};
