//! DTOs for the crawl endpoint

use mjlog_domain::RunReport;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for a crawl run in which every candidate was handled
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CrawlResponse {
    /// Identifier of the run, also recorded on every log line of the run
    #[schema(example = "01922e7c-7a4b-7c1e-9d2f-3b5a1c0e8f00")]
    pub run_id: String,
    /// Number of distinct logs listed by the source
    #[schema(example = 12)]
    pub discovered: usize,
    /// Logs already present in storage
    #[schema(example = 10)]
    pub skipped: usize,
    /// Logs fetched, stored and announced during this run
    #[schema(example = 2)]
    pub ingested: usize,
    #[schema(example = "2024-10-01T12:00:00Z")]
    pub started_at: String,
    #[schema(example = "2024-10-01T12:00:03Z")]
    pub finished_at: String,
}

impl From<&RunReport> for CrawlResponse {
    fn from(report: &RunReport) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            discovered: report.discovered,
            skipped: report.skipped,
            ingested: report.ingested,
            started_at: report.started_at.to_rfc3339(),
            finished_at: report.finished_at.to_rfc3339(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error description
    #[schema(example = "failed to process the files (2019010112gm-0089-0000-aaaa)")]
    pub error: String,
    /// Identifiers of the logs that failed, empty when discovery itself failed
    #[schema(example = json!(["2019010112gm-0089-0000-aaaa"]))]
    pub failed: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            failed: Vec::new(),
        }
    }
}
