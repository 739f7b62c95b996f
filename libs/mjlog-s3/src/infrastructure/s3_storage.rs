//! S3 Storage Implementation
//!
//! This module implements the `StorageRepository` port using AWS S3 (or any
//! S3-compatible store such as MinIO) as the backend. It converts AWS errors to
//! domain errors.

use aws_sdk_s3::{error::ProvideErrorMetadata, primitives::ByteStream, Client};
use bytes::Bytes;
use mjlog_domain::{
    ingestion::{ItemId, StorageError},
    ports::StorageRepository,
};
use tracing::{debug, error, info, instrument, warn};

/// Object key extension for stored logs
pub const LOG_EXTENSION: &str = "mjlog";

/// S3-based implementation of the StorageRepository port
///
/// Logs are stored flat under an optional key prefix: `{prefix}{id}.mjlog`.
///
/// ## Write Semantics
///
/// Uploads are conditional (`If-None-Match: *`): an existing object is never
/// overwritten. A concurrent writer that got there first surfaces as
/// `StorageError::AlreadyExists`.
///
/// ## Error Handling
///
/// A `NotFound` answer to the metadata lookup means "does not exist". Every
/// other AWS SDK error is converted to `StorageError::Backend`.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3 storage writing at the root of the bucket
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use aws_sdk_s3::Client;
    /// use mjlog_s3::infrastructure::S3Storage;
    ///
    /// # async fn example() {
    /// let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    /// let s3_client = Client::new(&config);
    /// let storage = S3Storage::new(s3_client, "mjlog".to_string());
    /// # }
    /// ```
    pub fn new(client: Client, bucket: String) -> Self {
        Self::with_prefix(client, bucket, String::new())
    }

    /// Create a new S3 storage writing every key under `prefix`
    pub fn with_prefix(client: Client, bucket: String, prefix: String) -> Self {
        info!(bucket = %bucket, prefix = %prefix, "Initializing S3Storage");
        Self {
            client,
            bucket,
            prefix,
        }
    }

    /// Create a new S3 storage from the ambient AWS configuration
    ///
    /// Region, credentials and endpoint are read from the usual AWS environment
    /// variables and profiles. Path-style addressing is forced so that MinIO
    /// endpoints work out of the box.
    pub async fn from_env(bucket: String, prefix: String) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true) // Required for MinIO
            .build();

        Self::with_prefix(Client::from_conf(s3_config), bucket, prefix)
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl StorageRepository for S3Storage {
    fn path_for(&self, id: &ItemId) -> String {
        format!("{}{}.{}", self.prefix, id, LOG_EXTENSION)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn exists(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<bool, StorageError>> + Send {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = path.to_string();

        async move {
            debug!(key = %key, "Checking if log exists in S3");

            match client.head_object().bucket(&bucket).key(&key).send().await {
                Ok(_) => {
                    debug!(key = %key, "Log exists in S3");
                    Ok(true)
                }
                Err(err) => {
                    if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                        debug!(key = %key, "Log does not exist in S3");
                        Ok(false)
                    } else {
                        error!(key = %key, error = ?err, "Failed to check log existence in S3");
                        Err(StorageError::backend(format!(
                            "S3 head_object failed for key '{}': {}",
                            key, err
                        )))
                    }
                }
            }
        }
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, data_size = data.len()))]
    fn save(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = path.to_string();
        let data = Bytes::copy_from_slice(data);

        async move {
            debug!(key = %key, "Saving log to S3");

            let body = ByteStream::from(data);

            match client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .if_none_match("*")
                .body(body)
                .send()
                .await
            {
                Ok(_) => {
                    info!(key = %key, "Successfully saved log to S3");
                    Ok(())
                }
                Err(err) => {
                    let code = err.as_service_error().and_then(|e| e.code());
                    if matches!(code, Some("PreconditionFailed" | "ConditionalRequestConflict")) {
                        warn!(key = %key, "Log was written concurrently, refusing to overwrite");
                        return Err(StorageError::AlreadyExists(key));
                    }
                    error!(key = %key, error = ?err, "Failed to save log to S3");
                    Err(StorageError::backend(format!(
                        "S3 put_object failed for key '{}': {}",
                        key, err
                    )))
                }
            }
        }
    }
}
