//! API routes

pub mod crawl;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    dto::crawl::{CrawlResponse, ErrorResponse},
    handlers, AppState,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::crawl::crawl_handler,
        health_handler
    ),
    components(
        schemas(CrawlResponse, ErrorResponse)
    ),
    tags(
        (name = "crawl", description = "Log discovery and ingestion"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "mjlog-crawler API",
        version = "0.1.0",
        description = "Archives Tenhou game logs and announces new games"
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(crawl::routes())
        .route("/health", axum::routing::get(health_handler))
        .with_state(state)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    ),
    tag = "health"
)]
async fn health_handler() -> &'static str {
    "OK"
}
