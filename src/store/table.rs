//! Table implementation
//!
//! HashMap-based table with RwLock for concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{ChestError, Result};
use crate::value::{uniform_tag, Scalar, Value};

use super::snapshot;

/// The key → value map plus its dirty flag
///
/// ## Concurrency:
/// - Mutations take the write lock for the whole check-then-apply step,
///   so a refused mutation never leaves a half-applied entry
/// - Reads and snapshot encoding take the read lock
/// - `dirty` is only raised under the write lock and only cleared under the
///   read lock, so a snapshot never misses a mutation it did not include
/// - `closed` is set under the write lock, so no mutation lands after the
///   snapshot taken at close
pub struct Table {
    data: RwLock<HashMap<String, Value>>,
    dirty: AtomicBool,
    closed: AtomicBool,
}

impl Table {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// Wrap a map loaded from a snapshot (starts clean)
    pub fn from_map(data: HashMap<String, Value>) -> Self {
        Self {
            data: RwLock::new(data),
            dirty: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Take the write lock, refusing if the table is closed
    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Value>>> {
        let data = self.data.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(ChestError::Closed);
        }
        Ok(data)
    }

    /// Get a copy of the value under `key`
    pub fn get(&self, key: &str) -> Result<Value> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ChestError::KeyNotFound(key.to_string()))
    }

    /// Overwrite (or create) the entry under `key`
    pub fn set(&self, key: String, value: Value) -> Result<()> {
        value
            .check()
            .map_err(|e| ChestError::type_mismatch(&key, e))?;

        let mut data = self.write()?;
        data.insert(key, value);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Append items to a sequence, creating it if absent
    ///
    /// Returns the sequence length after the append.
    pub fn append(&self, key: &str, items: Vec<Scalar>) -> Result<usize> {
        let elem = uniform_tag(&items)
            .map_err(|e| ChestError::type_mismatch(key, e))?
            .ok_or_else(|| {
                ChestError::InvalidArgument("append requires at least one value".to_string())
            })?;

        let mut data = self.write()?;
        let len = match data.get_mut(key) {
            Some(existing) => existing
                .extend_sequence(elem, items)
                .map_err(|e| ChestError::type_mismatch(key, e))?,
            None => {
                let len = items.len();
                data.insert(key.to_string(), Value::Sequence { elem, items });
                len
            }
        };
        self.dirty.store(true, Ordering::Release);
        Ok(len)
    }

    /// Add a member to a set, creating it if absent
    ///
    /// Returns `true` if the member was not already present.
    pub fn set_add(&self, key: &str, member: Scalar) -> Result<bool> {
        let mut data = self.write()?;
        let added = match data.get_mut(key) {
            Some(existing) => existing
                .insert_member(member)
                .map_err(|e| ChestError::type_mismatch(key, e))?,
            None => {
                let elem = member.tag();
                let mut members = std::collections::HashSet::with_capacity(1);
                members.insert(member);
                data.insert(key.to_string(), Value::Set { elem, members });
                true
            }
        };
        if added {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(added)
    }

    /// Check that `member` is in the set under `key`
    pub fn set_exists(&self, key: &str, member: &Scalar) -> Result<()> {
        let data = self.data.read();
        let value = data
            .get(key)
            .ok_or_else(|| ChestError::KeyNotFound(key.to_string()))?;

        if value
            .contains_member(member)
            .map_err(|e| ChestError::type_mismatch(key, e))?
        {
            Ok(())
        } else {
            Err(ChestError::MemberNotFound {
                key: key.to_string(),
            })
        }
    }

    /// Encode a point-in-time snapshot and clear the dirty flag
    ///
    /// Returns the image, its entry count, and whether the table was dirty.
    /// If the caller fails to persist a dirty image it must call `mark_dirty`.
    pub fn encode_snapshot(&self) -> Result<(Vec<u8>, usize, bool)> {
        let data = self.data.read();
        let was_dirty = self.dirty.swap(false, Ordering::AcqRel);
        match snapshot::encode(&data) {
            Ok(image) => Ok((image, data.len(), was_dirty)),
            Err(e) => {
                if was_dirty {
                    self.dirty.store(true, Ordering::Release);
                }
                Err(e)
            }
        }
    }

    /// Refuse all further mutations
    ///
    /// Waits for in-flight mutations to finish. Reads keep working.
    pub fn close(&self) {
        let _data = self.data.write();
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Raise the dirty flag after a failed save
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// All keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
