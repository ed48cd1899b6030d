//! SSTable - immutable sorted run on disk.
//!
//! An SSTable pairs a line-oriented data file (`key:value:flag`, ascending
//! keys, no duplicates) with a binary Bloom filter file. Metadata
//! (key bounds, entry count) and the Bloom filter are loaded eagerly;
//! the entries and their fence pointers are materialized on first read
//! behind a per-table lock.
//!
//! Data files are written to a `.tmp` name and renamed into place, so a
//! crash mid-write never leaves a partial table visible to a directory
//! scan.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::bloom::BloomFilter;
use crate::types::DataPair;
use crate::util::filename::delete_file;
use crate::{Error, Result};

/// Sparse index entry locating one fixed-size block by its first key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencePointer {
    /// Key of the first entry in the block.
    pub min_key: i32,
    /// Offset of the block's first entry within the table.
    pub data_offset: usize,
    /// Number of entries in the block.
    pub block_len: usize,
}

/// Materialized table contents: the sorted entries plus their fence index.
#[derive(Debug)]
pub struct TableData {
    /// All entries, ascending by key.
    pub entries: Vec<DataPair>,
    /// Fence pointers partitioning `entries` into contiguous blocks.
    pub fences: Vec<FencePointer>,
}

impl TableData {
    /// Locate the `[start, end)` entry range of the block that could hold
    /// `key`: the unique block with `min_key <= key < next_block.min_key`.
    ///
    /// Returns `None` when `key` precedes the first block.
    pub fn fence_range(&self, key: i32) -> Option<(usize, usize)> {
        let idx = self.fences.partition_point(|f| f.min_key <= key);
        if idx == 0 {
            return None;
        }
        let block = self.fences[idx - 1];
        Some((block.data_offset, block.data_offset + block.block_len))
    }
}

/// Immutable sorted table.
///
/// Created once by a flush or a merge, then only read. Destroyed (and its
/// files deleted) only after it has been unlinked from its level.
#[derive(Debug)]
pub struct SSTable {
    /// Level this table belongs to.
    level_num: usize,
    /// Monotonic file id; also the creation-order tiebreak within a level.
    file_id: u64,
    /// Data file path.
    file_path: PathBuf,
    /// Bloom filter file path.
    bloom_path: PathBuf,
    /// Smallest key, `i32::MAX` when empty.
    min_key: i32,
    /// Largest key, `i32::MIN` when empty.
    max_key: i32,
    /// Entry count.
    size: usize,
    /// Entries per fence block.
    block_entries: usize,
    /// False-positive rate used when the filter must be rebuilt.
    bloom_fp_rate: f64,
    /// Bloom filter; `None` until rebuilt when its file was missing.
    bloom: RwLock<Option<BloomFilter>>,
    /// Lazily loaded contents.
    data: Mutex<Option<Arc<TableData>>>,
}

impl SSTable {
    /// Build a table from sorted, duplicate-free entries and persist it.
    ///
    /// Writes the data file (temp + rename) and the Bloom filter file.
    /// Any write failure removes the partial files and fails the whole
    /// construction; the caller must treat its flush or merge as failed.
    pub fn create(
        entries: Vec<DataPair>,
        level_num: usize,
        file_id: u64,
        file_path: PathBuf,
        bloom_path: PathBuf,
        block_entries: usize,
        bloom_fp_rate: f64,
    ) -> Result<Self> {
        debug_assert!(
            entries.windows(2).all(|w| w[0].key < w[1].key),
            "SSTable input must be sorted and duplicate-free"
        );

        let (min_key, max_key) = key_bounds(&entries);
        let size = entries.len();

        let mut bloom = BloomFilter::with_capacity(size, bloom_fp_rate);
        for entry in &entries {
            bloom.add(entry.key);
        }
        let fences = build_fences(&entries, block_entries);

        let temp_path = temp_path_for(&file_path);
        if let Err(e) = write_files(&entries, &bloom, &temp_path, &file_path, &bloom_path) {
            let _ = delete_file(&temp_path);
            let _ = delete_file(&file_path);
            let _ = delete_file(&bloom_path);
            return Err(e);
        }

        Ok(Self {
            level_num,
            file_id,
            file_path,
            bloom_path,
            min_key,
            max_key,
            size,
            block_entries,
            bloom_fp_rate,
            bloom: RwLock::new(Some(bloom)),
            data: Mutex::new(Some(Arc::new(TableData { entries, fences }))),
        })
    }

    /// Open an existing table lazily.
    ///
    /// Scans the data file for key bounds and entry count and reads the
    /// Bloom filter eagerly; a missing Bloom file is tolerated (it is
    /// rebuilt from the entries on first full load), a corrupt one is not.
    pub fn open(
        level_num: usize,
        file_id: u64,
        file_path: PathBuf,
        bloom_path: PathBuf,
        block_entries: usize,
        bloom_fp_rate: f64,
    ) -> Result<Self> {
        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);

        let mut size = 0usize;
        let mut first: Option<String> = None;
        let mut last: Option<String> = None;
        for line in reader.lines() {
            let line = line?;
            size += 1;
            if first.is_none() {
                first = Some(line.clone());
            }
            last = Some(line);
        }

        let min_key = match &first {
            Some(line) => DataPair::from_line(line)?.key,
            None => i32::MAX,
        };
        let max_key = match &last {
            Some(line) => DataPair::from_line(line)?.key,
            None => i32::MIN,
        };

        let bloom = BloomFilter::read_from(&bloom_path)?;

        Ok(Self {
            level_num,
            file_id,
            file_path,
            bloom_path,
            min_key,
            max_key,
            size,
            block_entries,
            bloom_fp_rate,
            bloom: RwLock::new(bloom),
            data: Mutex::new(None),
        })
    }

    /// Level this table belongs to.
    pub fn level_num(&self) -> usize {
        self.level_num
    }

    /// Monotonic file id.
    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    /// Entry count.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Smallest key; `i32::MAX` for an empty table.
    pub fn min_key(&self) -> i32 {
        self.min_key
    }

    /// Largest key; `i32::MIN` for an empty table.
    pub fn max_key(&self) -> i32 {
        self.max_key
    }

    /// Check whether `key` falls inside `[min_key, max_key]`.
    ///
    /// Always false for an empty table.
    pub fn key_in_range(&self, key: i32) -> bool {
        key >= self.min_key && key <= self.max_key
    }

    /// Consult the Bloom filter.
    ///
    /// When the filter is not yet available (missing file, not rebuilt
    /// yet) the table cannot be excluded, so this answers true.
    pub fn might_contain(&self, key: i32) -> bool {
        match &*self.bloom.read() {
            Some(bloom) => bloom.might_contain(key),
            None => true,
        }
    }

    /// Look up a key, returning the record even when it is a tombstone.
    ///
    /// Narrows to one fence block, then binary-searches within it. May
    /// trigger the one-time lazy load.
    pub fn get(&self, key: i32) -> Result<Option<DataPair>> {
        if !self.key_in_range(key) {
            return Ok(None);
        }

        let data = self.data()?;
        let (start, end) = match data.fence_range(key) {
            Some(range) => range,
            None => return Ok(None),
        };

        let block = &data.entries[start..end];
        match block.binary_search_by(|pair| pair.key.cmp(&key)) {
            Ok(idx) => Ok(Some(block[idx])),
            Err(_) => Ok(None),
        }
    }

    /// Snapshot the entries with keys in `[lo, hi)`, tombstones included.
    pub fn scan(&self, lo: i32, hi: i32) -> Result<Vec<DataPair>> {
        if hi <= lo || self.size == 0 || lo > self.max_key || hi <= self.min_key {
            return Ok(Vec::new());
        }

        let data = self.data()?;
        let start = data.entries.partition_point(|p| p.key < lo);
        let end = data.entries.partition_point(|p| p.key < hi);
        Ok(data.entries[start..end].to_vec())
    }

    /// Get the table contents, loading them from disk on first use.
    pub fn data(&self) -> Result<Arc<TableData>> {
        let mut guard = self.data.lock();
        if let Some(data) = &*guard {
            return Ok(Arc::clone(data));
        }

        let loaded = Arc::new(self.load_from_disk()?);

        if self.bloom.read().is_none() {
            let mut bloom = BloomFilter::with_capacity(loaded.entries.len(), self.bloom_fp_rate);
            for entry in &loaded.entries {
                bloom.add(entry.key);
            }
            *self.bloom.write() = Some(bloom);
            warn!(
                file = %self.file_path.display(),
                "rebuilt missing Bloom filter from table data"
            );
        }

        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Delete the data and Bloom files.
    ///
    /// Called only after the table has been removed from its level.
    pub fn delete_files(&self) -> std::io::Result<()> {
        delete_file(&self.file_path)?;
        delete_file(&self.bloom_path)
    }

    fn load_from_disk(&self) -> Result<TableData> {
        let file = File::open(&self.file_path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::with_capacity(self.size);
        for line in reader.lines() {
            let line = line?;
            entries.push(DataPair::from_line(&line)?);
        }

        if !entries.windows(2).all(|w| w[0].key < w[1].key) {
            return Err(Error::corruption(format!(
                "table {} is not sorted",
                self.file_path.display()
            )));
        }

        let fences = build_fences(&entries, self.block_entries);
        Ok(TableData { entries, fences })
    }
}

fn key_bounds(entries: &[DataPair]) -> (i32, i32) {
    match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => (first.key, last.key),
        _ => (i32::MAX, i32::MIN),
    }
}

fn build_fences(entries: &[DataPair], block_entries: usize) -> Vec<FencePointer> {
    let block_entries = block_entries.max(1);
    let mut fences = Vec::with_capacity(entries.len().div_ceil(block_entries));

    let mut data_offset = 0;
    while data_offset < entries.len() {
        let block_len = block_entries.min(entries.len() - data_offset);
        fences.push(FencePointer {
            min_key: entries[data_offset].key,
            data_offset,
            block_len,
        });
        data_offset += block_len;
    }

    fences
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_files(
    entries: &[DataPair],
    bloom: &BloomFilter,
    temp_path: &Path,
    file_path: &Path,
    bloom_path: &Path,
) -> Result<()> {
    let file = File::create(temp_path)?;
    let mut writer = BufWriter::new(&file);
    for entry in entries {
        writeln!(writer, "{}", entry.to_line())?;
    }
    writer.flush()?;
    drop(writer);
    file.sync_all()?;

    fs::rename(temp_path, file_path)?;
    bloom.write_to(bloom_path)?;
    Ok(())
}
