//! Multi-value key-value store with optional append-only durability.
//!
//! All operations are synchronous (blocking I/O). The async boundary is at
//! the caller ([`SharedStore`](crate::SharedStore)).

use crate::changelog::{Change, ChangeLog, LogError, SyncPolicy};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("change log error: {0}")]
    Log(#[from] LogError),
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A map from key to an ordered list of values (duplicates permitted),
/// optionally backed by a change log. Mutations hit the log before the map,
/// so the map never runs ahead of the durable record prefix.
#[derive(Debug, Default)]
pub struct KvStore {
    map: HashMap<Vec<u8>, Vec<Vec<u8>>>,
    log: Option<ChangeLog>,
}

impl KvStore {
    /// In-memory store; nothing is ever written or read from disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from literal key → values pairs. For each duplicated key the
    /// last occurrence counts.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<Vec<u8>>)>,
    {
        Self {
            map: pairs.into_iter().collect(),
            log: None,
        }
    }

    /// Open a file-backed store. An existing log is replayed into the map;
    /// a corrupt tail is detected and truncated before appending resumes.
    pub fn open(path: &Path, sync: SyncPolicy) -> Result<Self, StoreError> {
        let (log, changes) = ChangeLog::open(path, sync)?;
        let replayed = changes.len();
        let mut map = HashMap::new();
        for change in changes {
            Self::apply(&mut map, change);
        }
        tracing::info!(
            "store opened: {} record(s) replayed into {} key(s) from {:?}",
            replayed,
            map.len(),
            path
        );
        Ok(Self {
            map,
            log: Some(log),
        })
    }

    fn apply(map: &mut HashMap<Vec<u8>, Vec<Vec<u8>>>, change: Change) {
        match change {
            Change::Put { key, value } => map.entry(key).or_default().push(value),
            Change::Remove { key } => {
                map.remove(&key);
            }
            Change::Clear => map.clear(),
        }
    }

    /// Snapshot copy of the values under `key`, in insertion order. A
    /// missing key yields an empty vec and is not created.
    pub fn get(&self, key: &[u8]) -> Vec<Vec<u8>> {
        self.map.get(key).cloned().unwrap_or_default()
    }

    /// Append `value` under `key`. The change record is durable before this
    /// returns; on a log failure the map is left untouched.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if let Some(log) = &mut self.log {
            log.append_put(key, value)?;
        }
        self.map.entry(key.to_vec()).or_default().push(value.to_vec());
        Ok(())
    }

    /// Drop all values under `key`. Returns whether the key was present;
    /// removing an absent key appends nothing.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool, StoreError> {
        if !self.map.contains_key(key) {
            return Ok(false);
        }
        if let Some(log) = &mut self.log {
            log.append_remove(key)?;
        }
        self.map.remove(key);
        Ok(true)
    }

    /// Drop every key and value.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        if let Some(log) = &mut self.log {
            log.append_clear()?;
        }
        self.map.clear();
        Ok(())
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sync the change log to disk (for batch sync mode).
    pub fn sync(&mut self) -> Result<(), StoreError> {
        if let Some(log) = &mut self.log {
            log.sync()?;
        }
        Ok(())
    }
}
