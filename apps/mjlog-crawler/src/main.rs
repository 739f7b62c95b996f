//! mjlog-crawler
//!
//! HTTP service archiving a Tenhou player's game logs. Each `POST /crawl` lists
//! the player's logs, stores the ones not archived yet and announces them.

mod config;
mod dto;
mod handlers;
mod routes;
mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use mjlog_domain::{IngestionPipeline, PipelineConfig};
use mjlog_notify::NotifierBackend;
use mjlog_tenhou::{MjlogSummarizer, TenhouClient, TenhouConfig};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, storage::StorageBackend};

/// Pipeline wired with the production adapters
pub type CrawlPipeline =
    IngestionPipeline<StorageBackend, TenhouClient, MjlogSummarizer, NotifierBackend>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CrawlPipeline>,
    /// Held for the duration of a run
    pub run_lock: Arc<Mutex<()>>,
    /// Cancelled on shutdown; every run gets a child token
    pub shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting mjlog-crawler");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let storage = StorageBackend::from_settings(&config.storage).await;

    let source = TenhouClient::new(TenhouConfig {
        base_url: config.tenhou_base_url.clone(),
        user_name: config.user_name.clone(),
        timeout: config.http_timeout,
    })
    .context("Failed to build Tenhou client")?;

    let notifier = NotifierBackend::from_url(config.webhook_url.as_deref(), config.http_timeout)
        .context("Failed to build webhook notifier")?;

    let pipeline_config = PipelineConfig {
        workers: config.workers,
        call_timeout: config.http_timeout,
        ..PipelineConfig::default()
    };

    info!(
        user_name = %config.user_name,
        storage = storage.kind(),
        notifications = notifier.is_enabled(),
        workers = pipeline_config.workers,
        "Pipeline configured"
    );

    let pipeline = IngestionPipeline::new(
        storage,
        source,
        MjlogSummarizer::new(),
        notifier,
        pipeline_config,
    );

    let shutdown = CancellationToken::new();
    let state = AppState {
        pipeline: Arc::new(pipeline),
        run_lock: Arc::new(Mutex::new(())),
        shutdown: shutdown.clone(),
    };

    let app = routes::create_router(state);

    let addr = config.bind_addr();
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("mjlog-crawler stopped");
    Ok(())
}

/// `RUST_LOG` filter (default `info`), JSON lines when `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolve on SIGINT or SIGTERM and cancel in-flight runs
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Could not register Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Could not register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT signal (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM signal"),
    }

    info!("Shutdown requested, cancelling in-flight crawl");
    shutdown.cancel();
}
