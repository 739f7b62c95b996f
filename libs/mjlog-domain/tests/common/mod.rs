//! In-memory port implementations shared by the pipeline integration tests
//!
//! Every fake is a cheap `Clone` handle over shared state so a test can hand one
//! copy to the pipeline and keep another to inspect the calls afterwards.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mjlog_domain::ingestion::{
    FetchError, GameSummary, ItemId, NotifyError, Standing, StorageError, SummarizeError,
};
use mjlog_domain::ports::{LogSource, Notifier, StorageRepository, Summarizer};

/// Tracks how many calls are in flight at the same time
#[derive(Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct StorageState {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing_saves: Mutex<HashSet<String>>,
    exists_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

/// Storage backed by a HashMap, surviving across pipeline runs
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<StorageState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `id` was ingested by an earlier run
    pub fn preload(&self, id: &str) {
        let path = self.path_for(&ItemId::from(id));
        self.state
            .files
            .lock()
            .unwrap()
            .insert(path, b"<mjloggm/>".to_vec());
    }

    /// Make every save of `id` fail
    pub fn fail_save_of(&self, id: &str) {
        let path = self.path_for(&ItemId::from(id));
        self.state.failing_saves.lock().unwrap().insert(path);
    }

    pub fn contains(&self, id: &str) -> bool {
        let path = self.path_for(&ItemId::from(id));
        self.state.files.lock().unwrap().contains_key(&path)
    }

    pub fn len(&self) -> usize {
        self.state.files.lock().unwrap().len()
    }

    pub fn exists_calls(&self) -> usize {
        self.state.exists_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.state.save_calls.load(Ordering::SeqCst)
    }
}

impl StorageRepository for MemoryStorage {
    fn path_for(&self, id: &ItemId) -> String {
        format!("tmp/{}.mjlog", id)
    }

    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StorageError>> + Send {
        self.state.exists_calls.fetch_add(1, Ordering::SeqCst);
        let exists = self.state.files.lock().unwrap().contains_key(path);
        async move { Ok(exists) }
    }

    fn save(&self, path: &str, data: &[u8]) -> impl Future<Output = Result<(), StorageError>> + Send {
        self.state.save_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.state.failing_saves.lock().unwrap().contains(path) {
            Err(StorageError::io(format!("disk full while writing {}", path)))
        } else {
            self.state
                .files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        };
        async move { result }
    }
}

#[derive(Default)]
struct SourceState {
    listing: Mutex<Option<FetchError>>,
    candidates: Mutex<Vec<ItemId>>,
    failing_fetches: Mutex<HashSet<ItemId>>,
    fetch_calls: AtomicUsize,
    in_flight: ConcurrencyGauge,
}

/// Log source returning a fixed listing
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Arc<SourceState>,
    fetch_delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn with_candidates(ids: &[&str]) -> Self {
        let source = Self::default();
        *source.state.candidates.lock().unwrap() = ids.iter().map(|id| ItemId::from(*id)).collect();
        source
    }

    pub fn failing_listing(err: FetchError) -> Self {
        let source = Self::default();
        *source.state.listing.lock().unwrap() = Some(err);
        source
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn fail_fetch_of(&self, id: &str) {
        self.state
            .failing_fetches
            .lock()
            .unwrap()
            .insert(ItemId::from(id));
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.state.in_flight.max()
    }
}

impl LogSource for ScriptedSource {
    fn list_candidates(&self) -> impl Future<Output = Result<Vec<ItemId>, FetchError>> + Send {
        let result = match self.state.listing.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.state.candidates.lock().unwrap().clone()),
        };
        async move { result }
    }

    fn fetch(&self, id: &ItemId) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let state = Arc::clone(&self.state);
        let delay = self.fetch_delay;
        let id = id.clone();
        async move {
            state.fetch_calls.fetch_add(1, Ordering::SeqCst);
            state.in_flight.enter();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            state.in_flight.exit();

            if state.failing_fetches.lock().unwrap().contains(&id) {
                Err(FetchError::status(500, format!("/0/log/find.cgi?log={}", id)))
            } else {
                Ok(format!("<mjloggm log=\"{}\"/>", id).into_bytes())
            }
        }
    }
}

/// Summarizer that accepts every log
pub struct StubSummarizer;

impl Summarizer for StubSummarizer {
    fn summarize(&self, _data: &[u8]) -> Result<GameSummary, SummarizeError> {
        Ok(GameSummary {
            title: "四般南喰赤".to_string(),
            standings: vec![
                Standing {
                    name: "Alice".to_string(),
                    score: 42000,
                    points: 52.0,
                },
                Standing {
                    name: "Bob".to_string(),
                    score: 8000,
                    points: -42.0,
                },
            ],
        })
    }
}

/// Notifier that remembers every message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) -> impl Future<Output = Result<(), NotifyError>> + Send {
        self.messages.lock().unwrap().push(message.to_string());
        async { Ok(()) }
    }
}
