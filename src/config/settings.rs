//! Application settings and Telegram configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{DEFAULT_MAX_CONCURRENT_UPLOADS, DEFAULT_WEBHOOK_TIMEOUT_SECS};

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("session.db")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            session_path,
        })
    }
}

/// Relay pipeline and sink settings.
///
/// Both sinks are optional: an unset webhook URL or store URI disables the
/// corresponding sink for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Webhook endpoint for forwarded messages.
    pub webhook_url: Option<String>,

    /// Timeout for a single webhook delivery in seconds.
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,

    /// MongoDB connection string.
    pub mongo_uri: Option<String>,

    /// MongoDB database name.
    #[serde(default = "default_mongo_db")]
    pub mongo_db: String,

    /// MongoDB collection name.
    #[serde(default = "default_mongo_collection")]
    pub mongo_collection: String,

    /// Maximum number of webhook deliveries in flight at once.
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,

    /// Sender id whose messages are never logged or forwarded.
    pub denied_sender_id: Option<i64>,

    /// Maximum media size accepted for staging, in bytes.
    pub max_media_bytes: Option<u64>,

    /// Directory for staged media downloads.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Whether already-logged messages are still forwarded to the webhook.
    #[serde(default = "default_forward_duplicates")]
    pub forward_duplicates: bool,
}

fn default_webhook_timeout() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

fn default_mongo_db() -> String {
    "telegram_logs".to_owned()
}

fn default_mongo_collection() -> String {
    "messages".to_owned()
}

fn default_max_concurrent_uploads() -> usize {
    DEFAULT_MAX_CONCURRENT_UPLOADS
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_forward_duplicates() -> bool {
    true
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout(),
            mongo_uri: None,
            mongo_db: default_mongo_db(),
            mongo_collection: default_mongo_collection(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
            denied_sender_id: None,
            max_media_bytes: None,
            download_dir: default_download_dir(),
            forward_duplicates: default_forward_duplicates(),
        }
    }
}

impl RelaySettings {
    /// Creates relay settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            webhook_url: std::env::var("N8N_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            webhook_timeout_secs: std::env::var("WEBHOOK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_webhook_timeout),
            mongo_uri: std::env::var("MONGO_URI").ok().filter(|s| !s.is_empty()),
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| default_mongo_db()),
            mongo_collection: std::env::var("MONGO_COLLECTION")
                .unwrap_or_else(|_| default_mongo_collection()),
            max_concurrent_uploads: std::env::var("MAX_CONCURRENT_UPLOADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or_else(default_max_concurrent_uploads),
            denied_sender_id: std::env::var("DENIED_SENDER_ID")
                .ok()
                .and_then(|s| s.parse().ok()),
            max_media_bytes: std::env::var("MAX_MEDIA_BYTES")
                .ok()
                .and_then(|s| s.parse().ok()),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map_or_else(|_| default_download_dir(), PathBuf::from),
            forward_duplicates: std::env::var("FORWARD_DUPLICATES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_forward_duplicates),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RelaySettings::default();
        assert!(settings.webhook_url.is_none());
        assert!(settings.mongo_uri.is_none());
        assert_eq!(settings.webhook_timeout_secs, 60);
        assert_eq!(settings.mongo_db, "telegram_logs");
        assert_eq!(settings.mongo_collection, "messages");
        assert_eq!(settings.max_concurrent_uploads, 3);
        assert!(settings.forward_duplicates);
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.session_path, PathBuf::from("session.db"));
    }
}
