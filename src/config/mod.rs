//! Configuration module for the relay bot.
//!
//! Handles loading and validation of bot configuration including
//! sink endpoints, relay policy, and Telegram API credentials.

mod settings;

pub use settings::{ConfigError, RelaySettings, TelegramConfig};

/// Default cap on concurrent webhook deliveries.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 3;

/// Default webhook request timeout in seconds.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 60;
