//! Ingestion pipeline - crawl orchestration
//!
//! One run lists the candidate logs once, hands them one by one to a fixed pool of
//! workers over a bounded channel, and collects every worker outcome through a
//! second channel drained by a dedicated collector task.
//!
//! ```text
//!  list_candidates ──► [candidates] ──► worker × N ──► [outcomes] ──► collector
//! ```
//!
//! The pool size caps the number of concurrent outbound calls regardless of how
//! many logs a run discovers.

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{ItemError, ItemId, Outcome, PipelineError, Result, RunId, RunReport, Stage};
use crate::ports::{LogSource, Notifier, StorageRepository, Summarizer};

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 10;

/// Default upper bound for a single port call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default prefix of the replay link placed in notifications
pub const DEFAULT_REPLAY_URL_PREFIX: &str = "http://tenhou.net/0/?log=";

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fixed worker pool size (default: 10, values below 1 are treated as 1)
    pub workers: usize,
    /// Timeout applied to every storage, fetch and notify call (default: 10s)
    pub call_timeout: Duration,
    /// Capacity of the candidate hand-off channel (default: 1)
    pub queue_capacity: usize,
    /// Prefix of the replay link in notifications
    pub replay_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            queue_capacity: 1,
            replay_url_prefix: DEFAULT_REPLAY_URL_PREFIX.to_string(),
        }
    }
}

struct Ports<S, F, Z, N> {
    storage: S,
    source: F,
    summarizer: Z,
    notifier: N,
}

/// Where a successfully processed item ended up
enum Terminal {
    AlreadyStored,
    Notified,
}

/// Pipeline that discovers, downloads, stores and announces game logs
///
/// ## Static Dispatch
///
/// The pipeline is generic over its four ports. The compiler generates a
/// specialized version for each combination of adapters.
///
/// ## Idempotency
///
/// Whether an item needs processing is decided by asking the storage, never by
/// in-memory history. Running the pipeline twice against the same storage
/// downloads and announces every log at most once.
pub struct IngestionPipeline<S, F, Z, N> {
    ports: Arc<Ports<S, F, Z, N>>,
    config: Arc<PipelineConfig>,
}

impl<S, F, Z, N> IngestionPipeline<S, F, Z, N>
where
    S: StorageRepository + 'static,
    F: LogSource + 'static,
    Z: Summarizer + 'static,
    N: Notifier + 'static,
{
    /// Create a new pipeline from its ports and configuration
    pub fn new(storage: S, source: F, summarizer: Z, notifier: N, config: PipelineConfig) -> Self {
        Self {
            ports: Arc::new(Ports {
                storage,
                source,
                summarizer,
                notifier,
            }),
            config: Arc::new(config),
        }
    }

    /// Create a new pipeline with default configuration
    pub fn with_ports(storage: S, source: F, summarizer: Z, notifier: N) -> Self {
        Self::new(storage, source, summarizer, notifier, PipelineConfig::default())
    }

    /// Get the pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline to completion
    ///
    /// # Returns
    ///
    /// A `RunReport` when every discovered item was either skipped or ingested.
    ///
    /// # Errors
    ///
    /// - `PipelineError::Discovery` / `DiscoveryTimeout` if the candidates could not be listed
    /// - `PipelineError::ItemsFailed` naming every item that failed
    pub async fn run(&self) -> Result<RunReport> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Run the pipeline until completion or until `cancel` fires
    ///
    /// On cancellation no new item is started; items already picked up by a
    /// worker finish their current processing chain.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) -> Result<RunReport> {
        let run_id = RunId::new();
        let span = info_span!("crawl_run", run_id = %run_id);
        self.execute(run_id, cancel).instrument(span).await
    }

    async fn execute(&self, run_id: RunId, cancel: CancellationToken) -> Result<RunReport> {
        let workers = self.config.workers.max(1);
        info!(workers, "Start crawling");

        let (candidate_tx, candidate_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let candidate_rx = Arc::new(Mutex::new(candidate_rx));
        let (outcome_tx, outcome_rx) = mpsc::channel(workers);

        let collector = tokio::spawn(collect(outcome_rx, RunReport::start(run_id)).in_current_span());

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(
                worker(
                    worker_id,
                    Arc::clone(&self.ports),
                    Arc::clone(&self.config),
                    Arc::clone(&candidate_rx),
                    outcome_tx.clone(),
                    cancel.clone(),
                )
                .in_current_span(),
            );
        }
        // Workers hold the only remaining senders: the collector stops once they are done
        drop(outcome_tx);

        let discovery = self.discover(candidate_tx, &cancel).await;

        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "Worker terminated abnormally");
            }
        }

        let mut report = match collector.await {
            Ok(report) => report,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                error!(error = %err, "Outcome collector was cancelled");
                return Err(PipelineError::Cancelled { failed: Vec::new() });
            }
        };
        report.finished_at = Utc::now();

        let listed = match discovery {
            Ok(listed) => listed,
            Err(PipelineError::Cancelled { .. }) => {
                warn!(failed = report.failed.len(), "Crawl cancelled during discovery");
                return Err(PipelineError::Cancelled {
                    failed: report.failed,
                });
            }
            Err(err) => return Err(err),
        };
        report.discovered = listed;

        if report.processed() < listed {
            warn!(
                discovered = listed,
                processed = report.processed(),
                "Crawl cancelled before every log was processed"
            );
            return Err(PipelineError::Cancelled {
                failed: report.failed,
            });
        }

        info!(
            discovered = report.discovered,
            skipped = report.skipped,
            ingested = report.ingested,
            failed = report.failed.len(),
            "Finished crawling"
        );

        if report.is_success() {
            Ok(report)
        } else {
            Err(PipelineError::ItemsFailed(super::AggregateError::new(
                report.failed,
            )))
        }
    }

    /// List candidates once and push them onto the work queue
    ///
    /// Dropping `candidates` on return closes the queue, which is what stops
    /// the workers. Returns the number of distinct candidates.
    async fn discover(
        &self,
        candidates: mpsc::Sender<ItemId>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let timeout = self.config.call_timeout;
        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled { failed: Vec::new() }),
            listing = tokio::time::timeout(timeout, self.ports.source.list_candidates()) => listing,
        };

        let ids = match listing {
            Ok(Ok(ids)) => ids,
            Ok(Err(err)) => {
                error!(error = %err, "Failed to list candidate logs");
                return Err(PipelineError::Discovery(err));
            }
            Err(_) => {
                error!(timeout = ?timeout, "Listing candidate logs timed out");
                return Err(PipelineError::DiscoveryTimeout(timeout));
            }
        };

        let mut seen = HashSet::with_capacity(ids.len());
        let distinct: Vec<ItemId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        info!(candidates = distinct.len(), "Discovered candidate logs");

        let listed = distinct.len();
        for id in distinct {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(PipelineError::Cancelled { failed: Vec::new() });
                }
                sent = candidates.send(id) => {
                    if sent.is_err() {
                        // Only happens if every worker is gone
                        error!("Work queue closed before discovery completed");
                        break;
                    }
                }
            }
        }

        Ok(listed)
    }
}

async fn worker<S, F, Z, N>(
    worker_id: usize,
    ports: Arc<Ports<S, F, Z, N>>,
    config: Arc<PipelineConfig>,
    candidates: Arc<Mutex<mpsc::Receiver<ItemId>>>,
    outcomes: mpsc::Sender<Outcome>,
    cancel: CancellationToken,
) where
    S: StorageRepository,
    F: LogSource,
    Z: Summarizer,
    N: Notifier,
{
    loop {
        let next = {
            let mut queue = candidates.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                id = queue.recv() => id,
            }
        };
        let Some(id) = next else {
            break;
        };

        let outcome = match AssertUnwindSafe(process_item(&ports, &config, id.clone()))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(worker_id, item_id = %id, reason = %reason, "Processing panicked");
                Outcome::Failed(id, ItemError::Panicked(reason))
            }
        };
        if outcomes.send(outcome).await.is_err() {
            error!(worker_id, "Outcome channel closed unexpectedly");
            break;
        }
    }
    debug!(worker_id, "Worker finished");
}

async fn process_item<S, F, Z, N>(
    ports: &Ports<S, F, Z, N>,
    config: &PipelineConfig,
    id: ItemId,
) -> Outcome
where
    S: StorageRepository,
    F: LogSource,
    Z: Summarizer,
    N: Notifier,
{
    match ingest_item(ports, config, &id).await {
        Ok(Terminal::AlreadyStored) => Outcome::Skipped(id),
        Ok(Terminal::Notified) => Outcome::Ingested(id),
        Err(err) => {
            warn!(item_id = %id, error = %err, "Failed to process log");
            Outcome::Failed(id, err)
        }
    }
}

/// existence check → fetch → persist → summarize → notify, stopping at the first error
async fn ingest_item<S, F, Z, N>(
    ports: &Ports<S, F, Z, N>,
    config: &PipelineConfig,
    id: &ItemId,
) -> std::result::Result<Terminal, ItemError>
where
    S: StorageRepository,
    F: LogSource,
    Z: Summarizer,
    N: Notifier,
{
    let timeout = config.call_timeout;
    let path = ports.storage.path_for(id);
    debug!(item_id = %id, path = %path, "Start processing");

    let exists = bounded(
        Stage::ExistenceCheck,
        timeout,
        ports.storage.exists(&path),
        ItemError::ExistenceCheck,
    )
    .await?;
    if exists {
        debug!(item_id = %id, "Log already exists");
        return Ok(Terminal::AlreadyStored);
    }

    let data = bounded(Stage::Fetch, timeout, ports.source.fetch(id), ItemError::Fetch).await?;

    debug!(item_id = %id, path = %path, size = data.len(), "Saving log");
    bounded(
        Stage::Persist,
        timeout,
        ports.storage.save(&path, &data),
        ItemError::Persist,
    )
    .await?;

    let summary = ports
        .summarizer
        .summarize(&data)
        .map_err(ItemError::Summarize)?;
    let message = summary.to_message(&config.replay_url_prefix, id);

    debug!(item_id = %id, "Sending notification");
    bounded(
        Stage::Notify,
        timeout,
        ports.notifier.notify(&message),
        ItemError::Notify,
    )
    .await?;

    info!(item_id = %id, path = %path, "Ingested log");
    Ok(Terminal::Notified)
}

/// Await a port call under the configured timeout
async fn bounded<T, E>(
    stage: Stage,
    timeout: Duration,
    call: impl Future<Output = std::result::Result<T, E>>,
    wrap: impl FnOnce(E) -> ItemError,
) -> std::result::Result<T, ItemError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(wrap),
        Err(_) => Err(ItemError::timeout(stage, timeout)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn collect(mut outcomes: mpsc::Receiver<Outcome>, mut report: RunReport) -> RunReport {
    while let Some(outcome) = outcomes.recv().await {
        report.record(&outcome);
    }
    report
}
