//! Crawl routes

use axum::{routing::post, Router};

use crate::{handlers::crawl::crawl_handler, AppState};

/// Create crawl routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/crawl", post(crawl_handler))
}
