//! Storage backend selected at startup

use std::future::Future;

use mjlog_domain::{
    ingestion::{ItemId, StorageError},
    ports::StorageRepository,
};
use mjlog_local::LocalStorage;
use mjlog_s3::S3Storage;
use tracing::info;

use crate::config::StorageSettings;

/// Closed set of storage adapters the crawler can run against
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalStorage),
    S3(S3Storage),
}

impl StorageBackend {
    /// Build the adapter described by `settings`
    ///
    /// The S3 client picks up credentials and endpoint from the standard AWS
    /// environment.
    pub async fn from_settings(settings: &StorageSettings) -> Self {
        match settings {
            StorageSettings::Local { base_dir } => {
                info!(base_dir = %base_dir.display(), "Using local storage");
                Self::Local(LocalStorage::new(base_dir.clone()))
            }
            StorageSettings::S3 { bucket, prefix } => {
                info!(bucket = %bucket, prefix = %prefix, "Using S3 storage");
                Self::S3(S3Storage::from_env(bucket.clone(), prefix.clone()).await)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::S3(_) => "s3",
        }
    }
}

impl StorageRepository for StorageBackend {
    fn path_for(&self, id: &ItemId) -> String {
        match self {
            Self::Local(storage) => storage.path_for(id),
            Self::S3(storage) => storage.path_for(id),
        }
    }

    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StorageError>> + Send {
        async move {
            match self {
                Self::Local(storage) => storage.exists(path).await,
                Self::S3(storage) => storage.exists(path).await,
            }
        }
    }

    fn save(&self, path: &str, data: &[u8]) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move {
            match self {
                Self::Local(storage) => storage.save(path, data).await,
                Self::S3(storage) => storage.save(path, data).await,
            }
        }
    }
}
