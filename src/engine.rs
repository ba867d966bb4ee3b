//! Engine Module
//!
//! The facade that owns the store and its durability scheduler.
//!
//! ## Responsibilities
//! - Load the snapshot on startup
//! - Wire the store's change notifications to the scheduler thread
//! - Route protocol commands to store operations
//! - Run the final save on close

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel;
use parking_lot::Mutex;

use crate::config::Config;
use crate::durability::{handler_for, ErrorHandler, Scheduler};
use crate::error::Result;
use crate::protocol::Command;
use crate::store::Store;
use crate::value::{Scalar, Value};

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Operations** (set/get/append/set_add/set_exists): called from any
///   number of threads. Mutations take the store's write lock for the
///   type check and update only; reads take the read lock.
/// - **Saves**: run on the scheduler thread (or the caller of
///   `flush_now`), one at a time, under the read lock only while encoding.
/// - Mutations never wait on disk I/O: the hand-off to the scheduler is a
///   non-blocking send into a depth-1 channel.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The store (the scheduler holds a weak reference to it)
    store: Arc<Store>,

    /// Background saver, taken on close
    scheduler: Mutex<Option<Scheduler>>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Load the snapshot if one exists
    /// 3. Install the configured save failure handler
    /// 4. Start the durability scheduler
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let (notify_tx, notify_rx) = channel::bounded(1);
        let store = Arc::new(Store::open(&config.snapshot_path, notify_tx)?);
        store.set_error_handler_arc(handler_for(config.save_failure_policy));

        let scheduler = Scheduler::spawn(
            Arc::downgrade(&store),
            notify_rx,
            config.debounce_window,
            config.flush_interval,
        )?;

        tracing::info!(
            keys = store.len(),
            "Engine opened on {}",
            config.snapshot_path.display()
        );

        Ok(Self {
            config,
            store,
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified snapshot file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config {
            snapshot_path: path.to_path_buf(),
            ..Config::default()
        };
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<Value>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Set { key, value } => {
                self.set(key, value)?;
                Ok(None)
            }
            Command::Append { key, values } => {
                self.append(&key, values)?;
                Ok(None)
            }
            Command::SetAdd { key, member } => {
                self.set_add(&key, member)?;
                Ok(None)
            }
            Command::SetExists { key, member } => {
                self.set_exists(&key, member)?;
                Ok(None)
            }
            Command::Ping => Ok(Some(Value::from("PONG"))),
            Command::Flush => {
                self.flush_now()?;
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Overwrite (or create) `key` with `value`
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.store.set(key, value)
    }

    /// Get the value under `key`
    pub fn get(&self, key: &str) -> Result<Value> {
        self.store.get(key)
    }

    /// Append `values` to the sequence under `key`
    ///
    /// Returns the sequence length after the append.
    pub fn append<I>(&self, key: &str, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        self.store.append(key, values)
    }

    /// Add `member` to the set under `key`
    ///
    /// Returns `false` if it was already a member.
    pub fn set_add(&self, key: &str, member: impl Into<Scalar>) -> Result<bool> {
        self.store.set_add(key, member)
    }

    /// Succeeds if `member` is in the set under `key`
    pub fn set_exists(&self, key: &str, member: impl Into<Scalar>) -> Result<()> {
        self.store.set_exists(key, member)
    }

    /// Save a snapshot synchronously
    ///
    /// The error is also delivered to the installed handler.
    pub fn flush_now(&self) -> Result<()> {
        self.store.save()
    }

    /// Install the save failure handler
    pub fn set_error_handler(&self, handler: impl ErrorHandler + 'static) {
        self.store.set_error_handler(handler);
    }

    /// Refuse further writes, then stop the scheduler after its final save
    ///
    /// Blocks until the final save has finished or failed. Writes issued
    /// after this point fail with `Closed`. Safe to call more than once;
    /// a later call only retries the save if the store is still dirty.
    pub fn close(&self) -> Result<()> {
        self.store.close();

        let scheduler = self.scheduler.lock().take();
        match scheduler {
            Some(scheduler) => {
                scheduler.stop()?;
                tracing::info!("Engine closed, {} saves performed", self.store.save_count());
            }
            None if self.store.is_dirty() => {
                self.store.save()?;
            }
            None => {}
        }
        Ok(())
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the underlying store
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Get the snapshot file path
    pub fn snapshot_path(&self) -> &Path {
        self.store.snapshot_path()
    }

    /// Whether there are unsaved mutations
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Number of successful saves since open
    pub fn save_count(&self) -> u64 {
        self.store.save_count()
    }

    /// When the last successful save finished
    pub fn last_save(&self) -> Option<Instant> {
        self.store.last_save()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Error closing engine: {}", e);
        }
    }
}
