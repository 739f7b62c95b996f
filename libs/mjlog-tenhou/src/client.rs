//! Tenhou log source
//!
//! Lists a player's recent games by scraping the DOWNLOAD links of the log search
//! page, and downloads individual logs from the same endpoint.

use std::time::Duration;

use mjlog_domain::{
    ingestion::{FetchError, ItemId},
    ports::LogSource,
};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Default Tenhou host
pub const DEFAULT_BASE_URL: &str = "https://tenhou.net";

/// Default timeout for a single HTTP request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DOWNLOAD_LINK_PATTERN: &str = r#"<a href="/0/log/find\.cgi\?log=(.+?)">DOWNLOAD</a>"#;

/// Errors that can occur while building a [`TenhouClient`]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid download link pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Configuration for the Tenhou client
#[derive(Debug, Clone)]
pub struct TenhouConfig {
    /// Host serving the log search pages (default: https://tenhou.net)
    pub base_url: String,
    /// Player whose games are listed
    pub user_name: String,
    /// Timeout for every request (default: 10s)
    pub timeout: Duration,
}

impl TenhouConfig {
    /// Configuration for `user_name` against the public Tenhou host
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_name: user_name.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP implementation of the LogSource port
#[derive(Clone)]
pub struct TenhouClient {
    http: reqwest::Client,
    config: TenhouConfig,
    download_link: Regex,
}

impl TenhouClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the underlying HTTP client cannot be built.
    pub fn new(config: TenhouConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let download_link = Regex::new(DOWNLOAD_LINK_PATTERN)?;

        info!(
            base_url = %config.base_url,
            user_name = %config.user_name,
            timeout = ?config.timeout,
            "Initializing TenhouClient"
        );

        Ok(Self {
            http,
            config,
            download_link,
        })
    }

    /// URL of the page listing the configured player's games
    pub fn listing_url(&self) -> String {
        format!(
            "{}/0/log/find.cgi?un={}",
            self.base(),
            urlencoding::encode(&self.config.user_name)
        )
    }

    /// URL serving the raw log of one game
    pub fn download_url(&self, id: &ItemId) -> String {
        format!("{}/0/log/find.cgi?log={}", self.base(), id)
    }

    /// Extract the log ids of every DOWNLOAD link in a listing page
    pub fn extract_ids(&self, page: &str) -> Vec<ItemId> {
        self.download_link
            .captures_iter(page)
            .map(|caps| ItemId::from(&caps[1]))
            .collect()
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            let msg = if e.is_timeout() {
                format!(
                    "Timeout fetching '{}' (exceeded {:?})",
                    url, self.config.timeout
                )
            } else if e.is_connect() {
                format!("Connection failed for '{}': {}", url, e)
            } else {
                format!("Failed to fetch '{}': {}", url, e)
            };
            FetchError::Request(msg)
        })?;

        if !response.status().is_success() {
            return Err(FetchError::status(response.status().as_u16(), url));
        }

        Ok(response)
    }
}

impl LogSource for TenhouClient {
    #[instrument(skip(self), fields(user_name = %self.config.user_name))]
    fn list_candidates(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ItemId>, FetchError>> + Send {
        let url = self.listing_url();

        async move {
            debug!(url = %url, "Fetching log listing");

            let response = self.get(&url).await.map_err(|err| {
                error!(url = %url, error = %err, "Failed to fetch log listing");
                err
            })?;
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::body(format!("'{}': {}", url, e)))?;
            let page = String::from_utf8(body.to_vec()).map_err(|e| {
                FetchError::InvalidListing(format!("listing is not valid UTF-8: {}", e))
            })?;

            let ids = self.extract_ids(&page);
            info!(count = ids.len(), "Fetched log listing");
            Ok(ids)
        }
    }

    #[instrument(skip(self), fields(item_id = %id))]
    fn fetch(&self, id: &ItemId) -> impl std::future::Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let url = self.download_url(id);

        async move {
            debug!(url = %url, "Downloading log");

            let response = self.get(&url).await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::body(format!("'{}': {}", url, e)))?;

            debug!(url = %url, size = body.len(), "Downloaded log");
            Ok(body.to_vec())
        }
    }
}
