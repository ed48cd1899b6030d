//! LsmTree - the engine orchestrator.
//!
//! Owns the write buffer and the level hierarchy and runs the two
//! background workers: a flush thread that turns full buffers into
//! level-0 SSTables, and a compaction thread that merges a source level
//! into the next one down.
//!
//! # Thread safety
//!
//! Foreground calls run on the caller's thread. Lock scopes are short
//! and never nested: readers copy a level's table list under its shared
//! lock, release it, and probe the copied handles with no lock held.
//! The two condition-variable signal pairs each have a dedicated mutex.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::buffer::{Buffer, PutOutcome};
use crate::compaction::merge_runs;
use crate::level::Level;
use crate::load;
use crate::options::Options;
use crate::sstable::SSTable;
use crate::stats::{Source, StatsReport};
use crate::types::DataPair;
use crate::util::filename::{
    bloom_dir, bloom_file_path, create_dir_if_missing, history_file_path, level_dir,
    list_table_files, remove_stale_temp_files, table_file_path,
};
use crate::Result;

/// Request slot and completion counter for the flush thread.
struct FlushSignal {
    state: Mutex<FlushState>,
    cv: Condvar,
}

#[derive(Default)]
struct FlushState {
    /// A flush has been requested; multiple signals collapse into one.
    requested: bool,
    /// The flush thread is inside a flush cycle.
    in_flight: bool,
    /// Completed flush cycles; waiters block until this advances.
    generation: u64,
}

/// Work queue for the compaction thread: a min-heap of level indices,
/// so lower levels are always compacted first.
struct CompactionQueue {
    state: Mutex<QueueState>,
    cv: Condvar,
}

struct QueueState {
    heap: BinaryHeap<Reverse<usize>>,
    /// Per-level pending flag; a queued level absorbs repeat signals.
    queued: Vec<bool>,
    in_flight: bool,
}

/// An embedded LSM-tree key-value store over `i32` keys and values.
///
/// Can be shared across threads behind an `Arc`; all operations take
/// `&self`. Dropping the tree flushes the buffer and joins the
/// background threads.
pub struct LsmTree {
    inner: Arc<TreeInner>,
    flush_handle: Option<JoinHandle<()>>,
    compaction_handle: Option<JoinHandle<()>>,
}

struct TreeInner {
    db_path: PathBuf,
    options: Options,
    buffer: Buffer,
    levels: Vec<Level>,
    next_file_id: AtomicU64,
    shutdown: AtomicBool,
    flush_signal: FlushSignal,
    compaction_queue: CompactionQueue,
}

impl LsmTree {
    /// Open a store at `db_path` with default options, creating it if
    /// missing.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(db_path, Options::default())
    }

    /// Open a store with custom options.
    ///
    /// Creates the directory layout, sweeps stale temp files, scans each
    /// level for `NNNNNN.sst` files, and starts the background threads.
    pub fn open_with_options(db_path: impl AsRef<Path>, options: Options) -> Result<Self> {
        options.validate()?;
        let db_path = db_path.as_ref().to_path_buf();
        create_dir_if_missing(&db_path)?;

        // Reserved for a future manifest; scanning reconstructs state.
        let history = history_file_path(&db_path);
        if !history.exists() {
            std::fs::write(&history, [])?;
        }

        let mut levels = Vec::with_capacity(options.total_levels);
        let mut max_file_id = 0u64;
        for level_num in 0..options.total_levels {
            let dir = level_dir(&db_path, level_num);
            create_dir_if_missing(&dir)?;
            create_dir_if_missing(&bloom_dir(&db_path, level_num))?;

            let swept = remove_stale_temp_files(&dir)?;
            if swept > 0 {
                warn!(level = level_num, removed = swept, "swept stale temp files");
            }

            let level = Level::new(level_num, options.table_capacity_for_level(level_num));
            for file_id in list_table_files(&dir)? {
                let table = SSTable::open(
                    level_num,
                    file_id,
                    table_file_path(&db_path, level_num, file_id),
                    bloom_file_path(&db_path, level_num, file_id),
                    options.block_entries,
                    options.bloom_fp_rate,
                )?;
                max_file_id = max_file_id.max(file_id);
                level.add(Arc::new(table));
            }
            levels.push(level);
        }

        let total_levels = options.total_levels;
        let buffer_capacity = options.buffer_capacity;
        let inner = Arc::new(TreeInner {
            buffer: Buffer::new(buffer_capacity),
            levels,
            next_file_id: AtomicU64::new(max_file_id + 1),
            shutdown: AtomicBool::new(false),
            flush_signal: FlushSignal {
                state: Mutex::new(FlushState::default()),
                cv: Condvar::new(),
            },
            compaction_queue: CompactionQueue {
                state: Mutex::new(QueueState {
                    heap: BinaryHeap::new(),
                    queued: vec![false; total_levels],
                    in_flight: false,
                }),
                cv: Condvar::new(),
            },
            db_path,
            options,
        });

        info!(
            path = %inner.db_path.display(),
            levels = total_levels,
            next_file_id = max_file_id + 1,
            "opened store"
        );

        let flush_inner = Arc::clone(&inner);
        let flush_handle = thread::Builder::new()
            .name("lsmdb-flush".to_string())
            .spawn(move || flush_inner.flush_loop())
            .expect("failed to spawn flush thread");

        let compaction_inner = Arc::clone(&inner);
        let compaction_handle = thread::Builder::new()
            .name("lsmdb-compaction".to_string())
            .spawn(move || compaction_inner.compaction_loop())
            .expect("failed to spawn compaction thread");

        Ok(Self {
            inner,
            flush_handle: Some(flush_handle),
            compaction_handle: Some(compaction_handle),
        })
    }

    /// Insert or update a key.
    pub fn put(&self, key: i32, value: i32) {
        self.inner.put_pair(DataPair::new(key, value));
    }

    /// Delete a key by writing a tombstone.
    pub fn delete(&self, key: i32) {
        self.inner.put_pair(DataPair::tombstone(key));
    }

    /// Look up a key. Tombstones hide the key.
    pub fn get(&self, key: i32) -> Option<i32> {
        self.inner.get(key)
    }

    /// Scan the half-open key range `[lo, hi)`, ascending.
    pub fn range(&self, lo: i32, hi: i32) -> Vec<(i32, i32)> {
        self.inner.range(lo, hi)
    }

    /// Upsert every `(key, value)` pair from a binary load file.
    ///
    /// Returns the number of pairs applied. A malformed file is rejected
    /// before any pair is applied.
    pub fn bulk_load(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.inner.bulk_load(path.as_ref())
    }

    /// Render the per-source population report.
    pub fn stats(&self) -> String {
        self.inner.stats()
    }

    /// Force a flush cycle and wait for it to complete.
    pub fn flush(&self) {
        self.inner.flush_and_wait();
    }

    /// Block until no flush or compaction work is pending or running.
    pub fn wait_for_background_work(&self) {
        self.inner.wait_for_background_work();
    }

    /// Number of entries currently in the write buffer.
    pub fn buffer_len(&self) -> usize {
        self.inner.buffer.len()
    }

    /// Table count per level, top down.
    pub fn table_counts(&self) -> Vec<usize> {
        self.inner.levels.iter().map(|l| l.table_count()).collect()
    }

    /// The store directory.
    pub fn path(&self) -> &Path {
        &self.inner.db_path
    }

    /// Flush the buffer and stop the background threads.
    pub fn close(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        // Notify under the signal mutexes so a worker between its flag
        // check and its wait cannot miss the wakeup.
        {
            let _state = self.inner.flush_signal.state.lock();
            self.inner.flush_signal.cv.notify_all();
        }
        {
            let _state = self.inner.compaction_queue.state.lock();
            self.inner.compaction_queue.cv.notify_all();
        }

        if let Some(handle) = self.flush_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.compaction_handle.take() {
            let _ = handle.join();
        }
        info!(path = %self.inner.db_path.display(), "closed store");
    }
}

impl Drop for LsmTree {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

impl TreeInner {
    /// Insert a record, applying backpressure while the buffer is full.
    fn put_pair(&self, pair: DataPair) {
        loop {
            match self.buffer.put(pair) {
                PutOutcome::Stored { len } => {
                    if len >= self.options.buffer_capacity {
                        self.request_flush();
                    }
                    return;
                }
                PutOutcome::Full => self.wait_for_room(),
            }
        }
    }

    fn get(&self, key: i32) -> Option<i32> {
        if let Some(pair) = self.buffer.get(key) {
            return if pair.deleted { None } else { Some(pair.value) };
        }

        for level in &self.levels {
            // Newest table first, so recency wins within the level.
            for table in level.sstables().iter().rev() {
                if !table.key_in_range(key) || !table.might_contain(key) {
                    continue;
                }
                match table.get(key) {
                    Ok(Some(pair)) => {
                        return if pair.deleted { None } else { Some(pair.value) };
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            file_id = table.file_id(),
                            level = table.level_num(),
                            error = %e,
                            "skipping unreadable table during read"
                        );
                    }
                }
            }
        }
        None
    }

    fn range(&self, lo: i32, hi: i32) -> Vec<(i32, i32)> {
        if hi <= lo {
            return Vec::new();
        }

        // First insert wins, so populate in priority order: buffer, then
        // each level newest to oldest.
        let mut winners: BTreeMap<i32, DataPair> = BTreeMap::new();
        for pair in self.buffer.scan(lo, hi) {
            winners.entry(pair.key).or_insert(pair);
        }

        for level in &self.levels {
            for table in level.sstables().iter().rev() {
                match table.scan(lo, hi) {
                    Ok(pairs) => {
                        for pair in pairs {
                            winners.entry(pair.key).or_insert(pair);
                        }
                    }
                    Err(e) => {
                        warn!(
                            file_id = table.file_id(),
                            level = table.level_num(),
                            error = %e,
                            "skipping unreadable table during range scan"
                        );
                    }
                }
            }
        }

        winners
            .into_values()
            .filter(|pair| !pair.deleted)
            .map(|pair| (pair.key, pair.value))
            .collect()
    }

    fn bulk_load(&self, path: &Path) -> Result<usize> {
        let pairs = load::read_pairs(path)?;
        let count = pairs.len();
        for (key, value) in pairs {
            self.put_pair(DataPair::new(key, value));
        }
        info!(path = %path.display(), pairs = count, "bulk load complete");
        Ok(count)
    }

    fn stats(&self) -> String {
        let mut winners: BTreeMap<i32, (Source, DataPair)> = BTreeMap::new();
        for pair in self.buffer.snapshot() {
            winners.entry(pair.key).or_insert((Source::Buffer, pair));
        }

        for (level_num, level) in self.levels.iter().enumerate() {
            for table in level.sstables().iter().rev() {
                match table.data() {
                    Ok(data) => {
                        for &pair in &data.entries {
                            winners
                                .entry(pair.key)
                                .or_insert((Source::Level(level_num), pair));
                        }
                    }
                    Err(e) => {
                        warn!(
                            file_id = table.file_id(),
                            level = table.level_num(),
                            error = %e,
                            "skipping unreadable table during stats"
                        );
                    }
                }
            }
        }

        let live: Vec<(Source, i32, i32)> = winners
            .into_values()
            .filter(|(_, pair)| !pair.deleted)
            .map(|(source, pair)| (source, pair.key, pair.value))
            .collect();
        StatsReport::new(live).to_string()
    }

    /// Signal the flush thread; a pending request absorbs the signal.
    fn request_flush(&self) {
        let mut state = self.flush_signal.state.lock();
        if !state.requested {
            state.requested = true;
            self.flush_signal.cv.notify_all();
        }
    }

    /// Request a flush and wait until the buffer contents present at the
    /// time of the call have been processed.
    ///
    /// When a cycle is already in flight it may have drained before this
    /// call, so completion of the *next* cycle is awaited instead; the
    /// pending request flag guarantees that next cycle runs.
    fn flush_and_wait(&self) {
        let mut state = self.flush_signal.state.lock();
        let target = state.generation + if state.in_flight { 2 } else { 1 };
        if !state.requested {
            state.requested = true;
            self.flush_signal.cv.notify_all();
        }

        while state.generation < target && !self.shutdown.load(Ordering::SeqCst) {
            self.flush_signal.cv.wait(&mut state);
        }
    }

    /// Backpressure: wait for one flush cycle to complete, then let the
    /// caller retry its insert.
    ///
    /// Only requests a new cycle when none is pending or running;
    /// re-requesting here would make the flusher run an extra cycle that
    /// drains a partially refilled buffer into an undersized table.
    fn wait_for_room(&self) {
        let mut state = self.flush_signal.state.lock();
        let target = state.generation + 1;
        if !state.requested && !state.in_flight {
            state.requested = true;
            self.flush_signal.cv.notify_all();
        }

        while state.generation < target && !self.shutdown.load(Ordering::SeqCst) {
            self.flush_signal.cv.wait(&mut state);
        }
    }

    fn wait_for_background_work(&self) {
        loop {
            {
                let mut state = self.flush_signal.state.lock();
                if state.requested || state.in_flight {
                    if self.shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    self.flush_signal.cv.wait(&mut state);
                    continue;
                }
            }
            {
                let mut state = self.compaction_queue.state.lock();
                if !state.heap.is_empty() || state.in_flight {
                    if self.shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    self.compaction_queue.cv.wait(&mut state);
                    continue;
                }
            }
            // A flush enqueues its compaction before reporting idle, and
            // a compaction enqueues the next level before reporting idle,
            // so checking flush first and the queue second is sufficient.
            return;
        }
    }

    fn enqueue_compaction(&self, level: usize) {
        let mut state = self.compaction_queue.state.lock();
        if !state.queued[level] {
            state.queued[level] = true;
            state.heap.push(Reverse(level));
            self.compaction_queue.cv.notify_all();
        }
    }

    /// Flush thread body.
    fn flush_loop(&self) {
        loop {
            {
                let mut state = self.flush_signal.state.lock();
                while !state.requested && !self.shutdown.load(Ordering::SeqCst) {
                    self.flush_signal.cv.wait(&mut state);
                }
                state.requested = false;
                state.in_flight = true;
            }

            let shutting_down = self.shutdown.load(Ordering::SeqCst);
            self.flush_once();

            {
                let mut state = self.flush_signal.state.lock();
                state.in_flight = false;
                state.generation += 1;
                self.flush_signal.cv.notify_all();
            }

            // A clean close drains whatever is buffered before exiting.
            if shutting_down && self.buffer.is_empty() {
                break;
            }
        }
        debug!("flush thread exiting");
    }

    fn flush_once(&self) {
        let entries = self.buffer.drain();
        if entries.is_empty() {
            return;
        }
        let entry_count = entries.len();

        let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        let result = SSTable::create(
            entries,
            0,
            file_id,
            table_file_path(&self.db_path, 0, file_id),
            bloom_file_path(&self.db_path, 0, file_id),
            self.options.block_entries,
            self.options.bloom_fp_rate,
        );

        match result {
            Ok(table) => {
                self.levels[0].add(Arc::new(table));
                debug!(file_id, entries = entry_count, "flushed buffer to level 0");
                self.enqueue_compaction(0);
            }
            Err(e) => {
                // The drained entries are lost; the id stays allocated so
                // ids on disk may be sparse.
                error!(file_id, error = %e, "flush failed, buffered data dropped");
            }
        }
    }

    /// Compaction thread body.
    fn compaction_loop(&self) {
        loop {
            let level = {
                let mut state = self.compaction_queue.state.lock();
                while state.heap.is_empty() && !self.shutdown.load(Ordering::SeqCst) {
                    self.compaction_queue.cv.wait(&mut state);
                }
                if self.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let level = match state.heap.pop() {
                    Some(Reverse(level)) => level,
                    None => continue,
                };
                state.queued[level] = false;
                state.in_flight = true;
                level
            };

            let result = self.compact_level(level);

            {
                let mut state = self.compaction_queue.state.lock();
                state.in_flight = false;
                self.compaction_queue.cv.notify_all();
            }

            if let Err(e) = result {
                // Task dropped; the tree state is unchanged.
                error!(level, error = %e, "compaction failed");
            }
        }
        debug!("compaction thread exiting");
    }

    /// Merge every table of `level` into fresh tables at `level + 1`.
    fn compact_level(&self, level: usize) -> Result<()> {
        let output_level = level + 1;
        if output_level >= self.levels.len() {
            return Ok(());
        }
        // The trigger may be stale by the time the task is popped.
        if !self.levels[level].needs_compaction() {
            return Ok(());
        }

        // Snapshot the source tier only; the next tier is appended to,
        // not merged with. Newest first so source index 0 wins key ties.
        let mut inputs = self.levels[level].sstables();
        if inputs.is_empty() {
            return Ok(());
        }
        inputs.reverse();

        let mut loaded = Vec::with_capacity(inputs.len());
        for table in &inputs {
            loaded.push(table.data()?);
        }
        let runs: Vec<&[DataPair]> = loaded.iter().map(|data| data.entries.as_slice()).collect();

        let deepest_output = output_level == self.levels.len() - 1;
        let merged = merge_runs(&runs, deepest_output, self.options.max_table_entries);

        // Write every output before touching level membership; undo the
        // files already written if any one of them fails.
        let mut outputs: Vec<Arc<SSTable>> = Vec::with_capacity(merged.len());
        for entries in merged {
            let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
            let created = SSTable::create(
                entries,
                output_level,
                file_id,
                table_file_path(&self.db_path, output_level, file_id),
                bloom_file_path(&self.db_path, output_level, file_id),
                self.options.block_entries,
                self.options.bloom_fp_rate,
            );
            match created {
                Ok(table) => outputs.push(Arc::new(table)),
                Err(e) => {
                    for table in &outputs {
                        if let Err(cleanup) = table.delete_files() {
                            warn!(
                                file_id = table.file_id(),
                                error = %cleanup,
                                "failed to remove aborted merge output"
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }

        // Install outputs before removing inputs: a concurrent reader may
        // briefly see a key at both levels, with the upper level winning,
        // but never a gap where the key is at neither.
        let input_ids: Vec<u64> = inputs.iter().map(|table| table.file_id()).collect();
        for table in &outputs {
            self.levels[output_level].add(Arc::clone(table));
        }
        let removed = self.levels[level].remove_all(&input_ids);

        for table in &removed {
            if let Err(e) = table.delete_files() {
                warn!(
                    file_id = table.file_id(),
                    error = %e,
                    "failed to delete compacted table files"
                );
            }
        }

        info!(
            level,
            output_level,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "compacted level"
        );

        if self.levels[output_level].needs_compaction() && output_level + 1 < self.levels.len() {
            self.enqueue_compaction(output_level);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionsBuilder;
    use tempfile::tempdir;

    fn small_options() -> Options {
        OptionsBuilder::new()
            .buffer_capacity(2)
            .base_level_table_capacity(2)
            .level_size_ratio(1)
            .total_levels(3)
            .block_entries(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_put_get_delete_in_buffer() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open(dir.path()).unwrap();

        tree.put(1, 10);
        tree.put(2, 20);
        tree.put(1, 11);
        tree.delete(2);

        assert_eq!(tree.get(1), Some(11));
        assert_eq!(tree.get(2), None);
        assert_eq!(tree.get(3), None);
        assert_eq!(tree.range(0, 3), vec![(1, 11)]);
    }

    #[test]
    fn test_flush_produces_level0_table() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();

        tree.put(1, 10);
        tree.put(2, 20);
        tree.flush();

        assert_eq!(tree.buffer_len(), 0);
        assert!(tree.table_counts()[0] >= 1);
        assert!(dir.path().join("level_0").join("000001.sst").exists());
        assert!(dir
            .path()
            .join("level_0")
            .join("bloom_filters")
            .join("000001.sst.bf")
            .exists());

        assert_eq!(tree.get(1), Some(10));
        assert_eq!(tree.get(2), Some(20));
    }

    #[test]
    fn test_compaction_merges_level0_into_level1() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();

        for key in 1..=4 {
            tree.put(key, key * 10);
        }
        tree.flush();
        tree.wait_for_background_work();

        let counts = tree.table_counts();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[1], 1);

        assert_eq!(
            tree.range(0, 10),
            vec![(1, 10), (2, 20), (3, 30), (4, 40)]
        );
    }

    #[test]
    fn test_newer_wins_across_levels() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();

        tree.put(5, 50);
        tree.put(6, 60);
        tree.flush();
        tree.wait_for_background_work();

        tree.put(5, 55);
        assert_eq!(tree.get(5), Some(55));

        tree.flush();
        tree.wait_for_background_work();
        assert_eq!(tree.get(5), Some(55));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open(dir.path()).unwrap();

        tree.put(1, 10);
        assert!(tree.range(5, 5).is_empty());
        assert!(tree.range(5, 1).is_empty());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempdir().unwrap();

        {
            let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();
            for key in 0..10 {
                tree.put(key, key * 100);
            }
            tree.delete(3);
            tree.close();
        }

        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();
        for key in 0..10 {
            if key == 3 {
                assert_eq!(tree.get(key), None);
            } else {
                assert_eq!(tree.get(key), Some(key * 100));
            }
        }
    }

    #[test]
    fn test_file_ids_resume_after_reopen() {
        let dir = tempdir().unwrap();

        {
            let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();
            tree.put(1, 10);
            tree.put(2, 20);
            tree.flush();
            tree.close();
        }

        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();
        tree.put(3, 30);
        tree.put(4, 40);
        tree.flush();
        tree.wait_for_background_work();

        // The reopened tree must not reuse the id of the existing table.
        assert_eq!(tree.get(1), Some(10));
        assert_eq!(tree.get(3), Some(30));
    }

    #[test]
    fn test_stats_reports_buffer_and_levels() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();

        tree.put(1, 10);
        tree.put(2, 20);
        tree.put(3, 30);
        tree.put(4, 40);
        tree.flush();
        tree.wait_for_background_work();
        tree.put(7, 70);

        let stats = tree.stats();
        assert!(stats.starts_with("Logical Pairs: 5"), "stats: {}", stats);
        assert!(stats.contains("BUF: 1"), "stats: {}", stats);
        assert!(stats.contains("7:70:BUF"), "stats: {}", stats);
        assert!(stats.contains("1:10:L2"), "stats: {}", stats);
    }

    #[test]
    fn test_bulk_load() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open_with_options(dir.path(), small_options()).unwrap();

        let path = dir.path().join("pairs.bin");
        let mut bytes = Vec::new();
        for key in 0..8 {
            bytes.extend_from_slice(&(key as i32).to_ne_bytes());
            bytes.extend_from_slice(&(key as i32 * 2).to_ne_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        assert_eq!(tree.bulk_load(&path).unwrap(), 8);
        tree.wait_for_background_work();
        for key in 0..8 {
            assert_eq!(tree.get(key), Some(key * 2));
        }
    }

    #[test]
    fn test_bulk_load_rejects_bad_size_without_side_effects() {
        let dir = tempdir().unwrap();
        let tree = LsmTree::open(dir.path()).unwrap();

        let path = dir.path().join("bad.bin");
        std::fs::write(&path, [0u8; 12]).unwrap();

        assert!(tree.bulk_load(&path).is_err());
        assert_eq!(tree.buffer_len(), 0);
    }
}
