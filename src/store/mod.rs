//! Store Module
//!
//! The in-memory map and its path to disk.
//!
//! ## Responsibilities
//! - Serialize access to the key → value map (RwLock)
//! - Type dispatch for `set` / `append` / `set_add` / `set_exists`
//! - Track the dirty flag and the time of the last successful save
//! - Signal the durability scheduler after each mutation (never blocks)
//! - Perform the atomic save routine and route failures to the handler

pub mod snapshot;
mod table;

pub use table::Table;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::{Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use crate::durability::{ErrorHandler, FatalHandler};
use crate::error::Result;
use crate::value::{Scalar, Value};

/// The store: a typed map with asynchronous snapshot persistence
///
/// `Store` never spawns threads itself. Mutations push a token into the
/// `notifier` channel, and whoever owns the receiving end (normally the
/// durability scheduler) decides when to call [`Store::save`].
pub struct Store {
    /// Key → value map and dirty flag
    table: Table,

    /// Target snapshot file
    snapshot_path: PathBuf,

    /// Change notifications, depth 1 (a send while full is dropped)
    notifier: Sender<()>,

    /// Save failure strategy for this instance
    handler: RwLock<Arc<dyn ErrorHandler>>,

    /// Only one save at a time (the scheduler is the sole file writer)
    save_lock: Mutex<()>,

    /// When the last successful save finished
    last_save: Mutex<Option<Instant>>,

    /// Number of successful saves
    save_count: AtomicU64,
}

impl Store {
    /// Open the store backed by `path`
    ///
    /// A missing file yields an empty store. A directory fails with
    /// `InvalidPath`, an undecodable file with `CorruptSnapshot`.
    pub fn open(path: impl AsRef<Path>, notifier: Sender<()>) -> Result<Self> {
        let path = path.as_ref();
        let table = match snapshot::load(path)? {
            Some(data) => {
                tracing::info!("Loaded {} keys from {}", data.len(), path.display());
                Table::from_map(data)
            }
            None => {
                tracing::info!("No snapshot at {}, starting empty", path.display());
                Table::new()
            }
        };

        Ok(Self {
            table,
            snapshot_path: path.to_path_buf(),
            notifier,
            handler: RwLock::new(Arc::new(FatalHandler)),
            save_lock: Mutex::new(()),
            last_save: Mutex::new(None),
            save_count: AtomicU64::new(0),
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Overwrite (or create) `key` with `value`
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.table.set(key.into(), value.into())?;
        self.notify();
        Ok(())
    }

    /// Read the value under `key`
    pub fn get(&self, key: &str) -> Result<Value> {
        self.table.get(key)
    }

    /// Append `values` to the sequence under `key`, creating it if absent
    pub fn append<I>(&self, key: &str, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        let items: Vec<Scalar> = values.into_iter().map(Into::into).collect();
        let len = self.table.append(key, items)?;
        self.notify();
        Ok(len)
    }

    /// Add `member` to the set under `key`, creating it if absent
    pub fn set_add(&self, key: &str, member: impl Into<Scalar>) -> Result<bool> {
        let added = self.table.set_add(key, member.into())?;
        if added {
            self.notify();
        }
        Ok(added)
    }

    /// Succeeds if `member` is in the set under `key`
    pub fn set_exists(&self, key: &str, member: impl Into<Scalar>) -> Result<()> {
        self.table.set_exists(key, &member.into())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save a snapshot now
    ///
    /// Failures are routed to the installed handler and also returned.
    /// A dirty store stays dirty after a failure; a clean one stays clean.
    /// The handler runs after the save lock is released, so it may retry.
    pub fn save(&self) -> Result<()> {
        let result = {
            let _guard = self.save_lock.lock();
            let started = Instant::now();
            self.save_locked().map(|(entries, bytes)| {
                *self.last_save.lock() = Some(Instant::now());
                self.save_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    entries,
                    bytes,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Saved snapshot to {}",
                    self.snapshot_path.display()
                );
            })
        };

        if let Err(ref e) = result {
            let handler = Arc::clone(&self.handler.read());
            handler.handle(e);
        }
        result
    }

    /// The save routine proper (called with `save_lock` held)
    fn save_locked(&self) -> Result<(usize, usize)> {
        // Step 1: Create the temporary file before touching the map
        let temp = snapshot::temp_path(&self.snapshot_path);
        let file = snapshot::create_temp(&temp)?;

        // Step 2: Encode under the read lock (clears the dirty flag)
        let (image, entries, was_dirty) = match self.table.encode_snapshot() {
            Ok(encoded) => encoded,
            Err(e) => {
                drop(file);
                snapshot::discard_temp(&temp);
                return Err(e);
            }
        };

        // Step 3: Write and fsync outside the lock, then atomically replace
        let persisted = snapshot::write_temp(file, &temp, &image)
            .and_then(|()| snapshot::commit(&temp, &self.snapshot_path));

        if let Err(e) = persisted {
            if was_dirty {
                self.table.mark_dirty();
            }
            return Err(e);
        }

        Ok((entries, image.len()))
    }

    /// Refuse further mutations (they fail with `Closed`)
    ///
    /// Returns once every in-flight mutation has landed, so a save started
    /// afterwards covers every write that was acknowledged.
    pub fn close(&self) {
        self.table.close();
    }

    pub fn is_closed(&self) -> bool {
        self.table.is_closed()
    }

    /// Install the save failure handler
    pub fn set_error_handler(&self, handler: impl ErrorHandler + 'static) {
        self.set_error_handler_arc(Arc::new(handler));
    }

    /// Install a shared save failure handler
    pub fn set_error_handler_arc(&self, handler: Arc<dyn ErrorHandler>) {
        *self.handler.write() = handler;
    }

    /// Non-blocking change notification (dropped if one is already pending)
    fn notify(&self) {
        match self.notifier.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::trace!("No durability scheduler attached");
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_dirty(&self) -> bool {
        self.table.is_dirty()
    }

    /// When the last successful save finished, if any
    pub fn last_save(&self) -> Option<Instant> {
        *self.last_save.lock()
    }

    /// Number of successful saves since open
    pub fn save_count(&self) -> u64 {
        self.save_count.load(Ordering::Relaxed)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.table.keys()
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}
