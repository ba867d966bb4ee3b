//! Configuration for ChestKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ChestError, Result};

/// Main configuration for a ChestKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// File holding the persisted snapshot of the store.
    /// Temporary files are created next to it as `{snapshot_path}.tmp.{suffix}`.
    pub snapshot_path: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Minimum time between two notification-triggered saves
    pub debounce_window: Duration,

    /// Period of the background tick that saves a dirty store
    pub flush_interval: Duration,

    /// What to do when a background save fails
    pub save_failure_policy: SaveFailurePolicy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = no timeout)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = no timeout)
    pub write_timeout_ms: u64,
}

/// Save failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFailurePolicy {
    /// Log and abort the process (an unsaveable store is an emergency)
    Fatal,

    /// Log, keep the store dirty and retry on the next trigger
    LogAndContinue,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./chestkv.snapshot"),
            debounce_window: Duration::from_secs(1),
            flush_interval: Duration::from_secs(1),
            save_failure_policy: SaveFailurePolicy::Fatal,
            listen_addr: "127.0.0.1:7480".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the durability intervals are usable
    pub fn validate(&self) -> Result<()> {
        if self.debounce_window.is_zero() {
            return Err(ChestError::Config(
                "debounce window must be greater than zero".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(ChestError::Config(
                "flush interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Set the debounce window for notification-triggered saves
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.config.debounce_window = window;
        self
    }

    /// Set the periodic flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Set the save failure policy
    pub fn save_failure_policy(mut self, policy: SaveFailurePolicy) -> Self {
        self.config.save_failure_policy = policy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
