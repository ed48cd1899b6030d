//! Buffer - in-memory sorted storage for recent writes.
//!
//! The buffer is the first destination for all writes. It is an ordered
//! map from key to record, so a later write for the same key replaces the
//! earlier value and tombstone flag in place. The flush thread drains the
//! whole buffer into a new level-0 SSTable.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::types::DataPair;

/// Result of inserting into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record was stored; `len` is the entry count afterwards.
    Stored {
        /// Number of entries in the buffer after the insert.
        len: usize,
    },
    /// The key is new and the buffer is at capacity; nothing was stored.
    Full,
}

/// In-memory write buffer.
///
/// Writers take the exclusive lock, readers the shared lock. Entry count
/// never exceeds `capacity`: the tree applies backpressure on `Full`.
#[derive(Debug)]
pub struct Buffer {
    /// Maximum number of entries.
    capacity: usize,
    /// Key-ordered contents.
    map: RwLock<BTreeMap<i32, DataPair>>,
}

impl Buffer {
    /// Create an empty buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or update a record.
    ///
    /// An upsert of an existing key always succeeds; a new key is rejected
    /// with [`PutOutcome::Full`] when the buffer is at capacity.
    pub fn put(&self, pair: DataPair) -> PutOutcome {
        let mut map = self.map.write();
        if !map.contains_key(&pair.key) && map.len() >= self.capacity {
            return PutOutcome::Full;
        }
        map.insert(pair.key, pair);
        PutOutcome::Stored { len: map.len() }
    }

    /// Look up a record, tombstones included.
    pub fn get(&self, key: i32) -> Option<DataPair> {
        self.map.read().get(&key).copied()
    }

    /// Number of entries currently buffered.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Check if the buffer has reached capacity.
    pub fn is_full(&self) -> bool {
        self.map.read().len() >= self.capacity
    }

    /// Move the contents out, leaving the buffer empty.
    ///
    /// Returns the records sorted by key, ready for SSTable construction.
    pub fn drain(&self) -> Vec<DataPair> {
        let mut map = self.map.write();
        let drained = std::mem::take(&mut *map);
        drained.into_values().collect()
    }

    /// Snapshot the records with keys in `[lo, hi)`, sorted by key.
    pub fn scan(&self, lo: i32, hi: i32) -> Vec<DataPair> {
        if hi <= lo {
            return Vec::new();
        }
        self.map
            .read()
            .range((Bound::Included(lo), Bound::Excluded(hi)))
            .map(|(_, pair)| *pair)
            .collect()
    }

    /// Snapshot every record, sorted by key.
    pub fn snapshot(&self) -> Vec<DataPair> {
        self.map.read().values().copied().collect()
    }
}
