//! Service configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tictactoe_engine::{DEFAULT_CAPACITY, DEFAULT_TOPIC, RetryPolicy};
use tracing::{debug, info, instrument};

/// Where published events end up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventTarget {
    /// Log each event through tracing.
    Log,
    /// One JSON envelope per line on stderr.
    Stderr,
    /// One JSON envelope per line, appended to a file.
    File {
        /// File to append to; created if missing.
        path: PathBuf,
    },
}

/// Outbox queue and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Undelivered events held before moves are refused.
    #[serde(default = "default_capacity")]
    capacity: usize,

    /// Failed attempts on one event before moves are refused.
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Milliseconds after the first failed attempt; doubles per failure.
    #[serde(default = "default_backoff_ms")]
    backoff_ms: u64,

    /// Cap on the wait between attempts, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
}

impl OutboxConfig {
    /// Retry policy for the outbox dispatcher.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Configuration for the game service.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Stream topic events are published under.
    #[serde(default = "default_topic")]
    topic: String,

    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    log_filter: String,

    /// Event destination.
    #[serde(default = "default_events")]
    events: EventTarget,

    /// Outbox retry settings.
    #[serde(default)]
    outbox: OutboxConfig,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_events() -> EventTarget {
    EventTarget::Log
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            log_filter: default_log_filter(),
            events: default_events(),
            outbox: OutboxConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(topic = %config.topic, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Replaces the topic.
    pub fn with_topic(mut self, topic: String) -> Self {
        self.topic = topic;
        self
    }

    /// Replaces the fallback log filter.
    pub fn with_log_filter(mut self, log_filter: String) -> Self {
        self.log_filter = log_filter;
        self
    }

    /// Replaces the event destination.
    pub fn with_events(mut self, events: EventTarget) -> Self {
        self.events = events;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
