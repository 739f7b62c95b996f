//! Environment configuration
//!
//! Every setting is read once at startup into [`AppConfig`]; nothing else in the
//! process reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while reading the configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Env {0} must be set but was not found")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Storage backend selected by `STORAGE_TYPE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    Local { base_dir: PathBuf },
    S3 { bucket: String, prefix: String },
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub user_name: String,
    pub tenhou_base_url: String,
    pub storage: StorageSettings,
    pub webhook_url: Option<String>,
    pub workers: usize,
    pub http_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let user_name = lookup("TENHOU_USER_NAME")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("TENHOU_USER_NAME"))?;

        let storage = match get_or("STORAGE_TYPE", "local").to_ascii_lowercase().as_str() {
            "local" => StorageSettings::Local {
                base_dir: PathBuf::from(get_or("LOCAL_STORAGE_DIR", "tmp")),
            },
            "s3" => StorageSettings::S3 {
                bucket: get_or("MJLOG_BUCKET", "mjlog"),
                prefix: get_or("MJLOG_KEY_PREFIX", ""),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_TYPE",
                    value: other.to_string(),
                    reason: "expected 'local' or 's3'".to_string(),
                })
            }
        };

        let workers = parse(&lookup, "CRAWL_WORKERS", 10usize)?;
        if workers == 0 {
            return Err(ConfigError::Invalid {
                key: "CRAWL_WORKERS",
                value: "0".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }

        let timeout_secs = parse(&lookup, "HTTP_TIMEOUT_SECS", 10u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        Ok(Self {
            user_name,
            tenhou_base_url: get_or("TENHOU_BASE_URL", "https://tenhou.net"),
            storage,
            webhook_url: lookup("NOTIFY_WEBHOOK_URL").filter(|v| !v.trim().is_empty()),
            workers,
            http_timeout: Duration::from_secs(timeout_secs),
            host: get_or("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 8080u16)?,
        })
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}
