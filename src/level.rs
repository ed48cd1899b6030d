//! Level - an ordered collection of SSTables at one depth.
//!
//! Tables are kept in creation-age order, oldest first; the read path
//! iterates a snapshot in reverse so newer tables win. Membership changes
//! take the exclusive lock, snapshots the shared lock, so a reader sees
//! either the pre-merge or the post-merge table set, never a mix.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::sstable::SSTable;

/// One level of the tree.
#[derive(Debug)]
pub struct Level {
    /// Depth, 0-indexed.
    level_num: usize,
    /// Soft cap on table count before compaction triggers.
    table_capacity: usize,
    /// Tables ordered oldest to newest.
    tables: RwLock<Vec<Arc<SSTable>>>,
    /// Total entries across all tables.
    entry_count: AtomicUsize,
}

impl Level {
    /// Create an empty level.
    pub fn new(level_num: usize, table_capacity: usize) -> Self {
        Self {
            level_num,
            table_capacity,
            tables: RwLock::new(Vec::new()),
            entry_count: AtomicUsize::new(0),
        }
    }

    /// Depth of this level.
    pub fn level_num(&self) -> usize {
        self.level_num
    }

    /// Table count that triggers compaction.
    pub fn table_capacity(&self) -> usize {
        self.table_capacity
    }

    /// Snapshot the table list, oldest first.
    pub fn sstables(&self) -> Vec<Arc<SSTable>> {
        self.tables.read().clone()
    }

    /// Append a table as the newest member.
    pub fn add(&self, table: Arc<SSTable>) {
        self.entry_count.fetch_add(table.size(), Ordering::Relaxed);
        self.tables.write().push(table);
    }

    /// Remove one table by file id, returning its handle.
    pub fn remove(&self, file_id: u64) -> Option<Arc<SSTable>> {
        let mut tables = self.tables.write();
        let idx = tables.iter().position(|table| table.file_id() == file_id)?;
        let removed = tables.remove(idx);
        self.entry_count.fetch_sub(removed.size(), Ordering::Relaxed);
        Some(removed)
    }

    /// Remove every table whose file id appears in `file_ids`.
    ///
    /// Returns the removed handles so the caller can delete their files
    /// once no snapshot can still be probing them.
    pub fn remove_all(&self, file_ids: &[u64]) -> Vec<Arc<SSTable>> {
        let mut tables = self.tables.write();
        let mut removed = Vec::new();

        tables.retain(|table| {
            if file_ids.contains(&table.file_id()) {
                removed.push(Arc::clone(table));
                false
            } else {
                true
            }
        });

        for table in &removed {
            self.entry_count.fetch_sub(table.size(), Ordering::Relaxed);
        }
        removed
    }

    /// Check whether this level is due for compaction.
    pub fn needs_compaction(&self) -> bool {
        self.tables.read().len() >= self.table_capacity
    }

    /// Number of tables currently in the level.
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Total entries across all tables.
    pub fn entry_count(&self) -> usize {
        self.entry_count.load(Ordering::Relaxed)
    }

    /// Check if the level holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataPair;
    use tempfile::tempdir;

    fn make_table(dir: &std::path::Path, id: u64, keys: &[i32]) -> Arc<SSTable> {
        let entries: Vec<DataPair> = keys.iter().map(|&k| DataPair::new(k, k)).collect();
        Arc::new(
            SSTable::create(
                entries,
                0,
                id,
                dir.join(format!("{:06}.sst", id)),
                dir.join(format!("{:06}.sst.bf", id)),
                4,
                0.01,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_add_preserves_age_order() {
        let dir = tempdir().unwrap();
        let level = Level::new(0, 4);

        level.add(make_table(dir.path(), 1, &[1, 2]));
        level.add(make_table(dir.path(), 2, &[1, 3]));
        level.add(make_table(dir.path(), 3, &[2, 4]));

        let ids: Vec<u64> = level.sstables().iter().map(|t| t.file_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(level.entry_count(), 6);
    }

    #[test]
    fn test_remove_all() {
        let dir = tempdir().unwrap();
        let level = Level::new(0, 4);

        level.add(make_table(dir.path(), 1, &[1]));
        level.add(make_table(dir.path(), 2, &[2, 3]));
        level.add(make_table(dir.path(), 3, &[4]));

        let removed = level.remove_all(&[1, 3]);
        assert_eq!(removed.len(), 2);
        assert_eq!(level.table_count(), 1);
        assert_eq!(level.sstables()[0].file_id(), 2);
        assert_eq!(level.entry_count(), 2);
    }

    #[test]
    fn test_remove_single() {
        let dir = tempdir().unwrap();
        let level = Level::new(0, 4);

        level.add(make_table(dir.path(), 1, &[1, 2, 3]));
        level.add(make_table(dir.path(), 2, &[4]));

        assert!(level.remove(9).is_none());
        let removed = level.remove(1).unwrap();
        assert_eq!(removed.file_id(), 1);
        assert_eq!(level.table_count(), 1);
        assert_eq!(level.entry_count(), 1);
    }

    #[test]
    fn test_needs_compaction() {
        let dir = tempdir().unwrap();
        let level = Level::new(0, 2);

        assert!(!level.needs_compaction());
        level.add(make_table(dir.path(), 1, &[1]));
        assert!(!level.needs_compaction());
        level.add(make_table(dir.path(), 2, &[2]));
        assert!(level.needs_compaction());
    }
}
