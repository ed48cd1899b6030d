//! On-disk naming conventions.
//!
//! Layout under the store directory:
//!
//! ```text
//! <db_path>/
//!   level_0/
//!     000001.sst
//!     bloom_filters/000001.sst.bf
//!   level_1/
//!     ...
//!   history         (reserved; empty)
//! ```
//!
//! File ids are zero-padded to 6 digits and strictly increase in
//! allocation order. Data files are written to a `.tmp` name and renamed
//! into place, so a partial `.sst` is never visible.

use std::path::{Path, PathBuf};

/// Directory holding one level's SSTables.
pub fn level_dir(db_path: &Path, level: usize) -> PathBuf {
    db_path.join(format!("level_{}", level))
}

/// Directory holding one level's Bloom filter files.
pub fn bloom_dir(db_path: &Path, level: usize) -> PathBuf {
    level_dir(db_path, level).join("bloom_filters")
}

/// Data file path for a table.
pub fn table_file_path(db_path: &Path, level: usize, file_id: u64) -> PathBuf {
    level_dir(db_path, level).join(format!("{:06}.sst", file_id))
}

/// Bloom filter file path for a table.
pub fn bloom_file_path(db_path: &Path, level: usize, file_id: u64) -> PathBuf {
    bloom_dir(db_path, level).join(format!("{:06}.sst.bf", file_id))
}

/// Reserved history file path.
pub fn history_file_path(db_path: &Path) -> PathBuf {
    db_path.join("history")
}

/// Parse a table data file name, returning its id.
///
/// Returns `None` for anything that is not an all-digit `.sst` name.
pub fn parse_table_file_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".sst")?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse::<u64>().ok()
}

/// List the table file ids in a level directory, ascending.
pub fn list_table_files(dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut ids = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(id) = parse_table_file_name(&name.to_string_lossy()) {
            ids.push(id);
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Remove leftover `.tmp` files from a level directory.
///
/// A temp file only exists when a table write was interrupted; the rename
/// never happened, so the table was never visible and the bytes are dead.
pub fn remove_stale_temp_files(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(".tmp") {
            delete_file(&entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Create a directory if it doesn't exist.
pub fn create_dir_if_missing(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete a file, ignoring "not found" errors.
pub fn delete_file(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_paths() {
        let db_path = Path::new("/data/db");

        assert_eq!(level_dir(db_path, 0), Path::new("/data/db/level_0"));
        assert_eq!(
            table_file_path(db_path, 0, 1),
            Path::new("/data/db/level_0/000001.sst")
        );
        assert_eq!(
            bloom_file_path(db_path, 2, 13),
            Path::new("/data/db/level_2/bloom_filters/000013.sst.bf")
        );
        assert_eq!(history_file_path(db_path), Path::new("/data/db/history"));
    }

    #[test]
    fn test_parse_table_file_name() {
        assert_eq!(parse_table_file_name("000001.sst"), Some(1));
        assert_eq!(parse_table_file_name("123456.sst"), Some(123456));

        assert_eq!(parse_table_file_name("000001.sst.tmp"), None);
        assert_eq!(parse_table_file_name("000001.sst.bf"), None);
        assert_eq!(parse_table_file_name("abc.sst"), None);
        assert_eq!(parse_table_file_name(".sst"), None);
        assert_eq!(parse_table_file_name("history"), None);
    }

    #[test]
    fn test_list_table_files() {
        let dir = tempdir().unwrap();

        std::fs::write(dir.path().join("000003.sst"), "").unwrap();
        std::fs::write(dir.path().join("000001.sst"), "").unwrap();
        std::fs::write(dir.path().join("000002.sst.tmp"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        assert_eq!(list_table_files(dir.path()).unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_remove_stale_temp_files() {
        let dir = tempdir().unwrap();

        std::fs::write(dir.path().join("000001.sst"), "").unwrap();
        std::fs::write(dir.path().join("000002.sst.tmp"), "").unwrap();

        assert_eq!(remove_stale_temp_files(dir.path()).unwrap(), 1);
        assert!(dir.path().join("000001.sst").exists());
        assert!(!dir.path().join("000002.sst.tmp").exists());
    }

    #[test]
    fn test_delete_file_tolerates_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.sst");

        assert!(delete_file(&path).is_ok());

        std::fs::write(&path, "x").unwrap();
        delete_file(&path).unwrap();
        assert!(!path.exists());
    }
}
