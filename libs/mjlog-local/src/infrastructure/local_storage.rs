//! Local Storage Implementation
//!
//! Stores every log as `{base_dir}/{id}.mjlog`.

use std::path::{Path, PathBuf};

use mjlog_domain::{
    ingestion::{ItemId, StorageError},
    ports::StorageRepository,
};
use tracing::{debug, error, info, instrument};

/// Directory used when none is configured
pub const DEFAULT_BASE_DIR: &str = "tmp";

/// File extension for stored logs
pub const LOG_EXTENSION: &str = "mjlog";

/// Filesystem-based implementation of the StorageRepository port
///
/// The base directory is created on the first save if it does not exist yet.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        info!(base_dir = %base_dir.display(), "Initializing LocalStorage");
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}

impl StorageRepository for LocalStorage {
    fn path_for(&self, id: &ItemId) -> String {
        self.base_dir
            .join(format!("{}.{}", id, LOG_EXTENSION))
            .to_string_lossy()
            .into_owned()
    }

    #[instrument(skip(self))]
    fn exists(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<bool, StorageError>> + Send {
        let file_path = PathBuf::from(path);

        async move {
            match tokio::fs::try_exists(&file_path).await {
                Ok(exists) => {
                    debug!(path = %file_path.display(), exists, "Checked log existence");
                    Ok(exists)
                }
                Err(err) => {
                    error!(path = %file_path.display(), error = %err, "Failed to stat log");
                    Err(StorageError::io(format!(
                        "Failed to stat '{}': {}",
                        file_path.display(),
                        err
                    )))
                }
            }
        }
    }

    #[instrument(skip(self, data), fields(data_size = data.len()))]
    fn save(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send {
        let base_dir = self.base_dir.clone();
        let file_path = PathBuf::from(path);
        let data = data.to_vec();

        async move {
            if let Err(err) = tokio::fs::create_dir_all(&base_dir).await {
                error!(base_dir = %base_dir.display(), error = %err, "Failed to create storage directory");
                return Err(StorageError::io(format!(
                    "Failed to create '{}': {}",
                    base_dir.display(),
                    err
                )));
            }

            match tokio::fs::write(&file_path, &data).await {
                Ok(()) => {
                    info!(path = %file_path.display(), "Successfully saved log");
                    Ok(())
                }
                Err(err) => {
                    error!(path = %file_path.display(), error = %err, "Failed to write log");
                    Err(StorageError::io(format!(
                        "Failed to write '{}': {}",
                        file_path.display(),
                        err
                    )))
                }
            }
        }
    }
}
