//! Crawl handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mjlog_domain::{PipelineError, RunReport};
use tracing::{error, info, warn};

use crate::{
    dto::crawl::{CrawlResponse, ErrorResponse},
    AppState,
};

/// Run one crawl and report how it went
///
/// Only one run may be in flight; a trigger arriving while a run is active is
/// answered with 409 instead of starting a second pool.
#[utoipa::path(
    post,
    path = "/crawl",
    responses(
        (status = 200, description = "Every candidate was skipped or ingested", body = CrawlResponse),
        (status = 409, description = "A crawl is already running", body = ErrorResponse),
        (status = 500, description = "Discovery failed or some logs could not be processed", body = ErrorResponse)
    ),
    tag = "crawl"
)]
pub async fn crawl_handler(State(state): State<AppState>) -> Response {
    let Ok(_running) = state.run_lock.try_lock() else {
        warn!("Crawl requested while another run is in progress");
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("a crawl is already running")),
        )
            .into_response();
    };

    info!("Received crawl request");
    let result = state
        .pipeline
        .run_until_cancelled(state.shutdown.child_token())
        .await;

    crawl_response(result)
}

/// Map the outcome of a run onto the HTTP response
pub fn crawl_response(result: Result<RunReport, PipelineError>) -> Response {
    match result {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                discovered = report.discovered,
                skipped = report.skipped,
                ingested = report.ingested,
                "Crawl finished"
            );
            (StatusCode::OK, Json(CrawlResponse::from(&report))).into_response()
        }
        Err(err) => {
            error!(error = %err, "Crawl failed");
            let failed = err
                .failed_items()
                .iter()
                .map(ToString::to_string)
                .collect();

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                    failed,
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use mjlog_domain::ingestion::{AggregateError, FetchError, ItemId};
    use serde::de::DeserializeOwned;

    async fn body_of<T: DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_reports_counts() {
        let report: RunReport = serde_json::from_value(serde_json::json!({
            "run_id": "01922e7c-7a4b-7c1e-9d2f-3b5a1c0e8f00",
            "discovered": 5,
            "skipped": 3,
            "ingested": 2,
            "failed": [],
            "started_at": "2024-10-01T12:00:00Z",
            "finished_at": "2024-10-01T12:00:03Z"
        }))
        .unwrap();

        let response = crawl_response(Ok(report));

        assert_eq!(response.status(), StatusCode::OK);
        let body: CrawlResponse = body_of(response).await;
        assert_eq!(body.run_id, "01922e7c-7a4b-7c1e-9d2f-3b5a1c0e8f00");
        assert_eq!(body.discovered, 5);
        assert_eq!(body.skipped, 3);
        assert_eq!(body.ingested, 2);
    }

    #[tokio::test]
    async fn test_items_failed_lists_ids() {
        let err = PipelineError::ItemsFailed(AggregateError::new(vec![
            ItemId::from("a"),
            ItemId::from("b"),
        ]));

        let response = crawl_response(Err(err));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_of(response).await;
        assert_eq!(body.error, "failed to process the files (a, b)");
        assert_eq!(body.failed, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_discovery_failure_has_no_failed_ids() {
        let err = PipelineError::Discovery(FetchError::status(503, "https://tenhou.net/0/log/find.cgi"));

        let response = crawl_response(Err(err));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_of(response).await;
        assert!(body.error.starts_with("Discovery failed"));
        assert!(body.failed.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_is_an_error() {
        let err = PipelineError::Cancelled {
            failed: vec![ItemId::from("a")],
        };

        let response = crawl_response(Err(err));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_of(response).await;
        assert_eq!(body.failed, vec!["a".to_string()]);
    }
}
