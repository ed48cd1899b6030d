//! Bulk binary pair ingest.
//!
//! A load file is a bare concatenation of `(i32 key, i32 value)` pairs in
//! native byte order. The file size must be a multiple of 8; anything
//! else is rejected before a single pair is applied.

use std::fs;
use std::path::Path;

use bytes::Buf;

use crate::{Error, Result};

/// Size of one encoded pair in bytes.
const PAIR_BYTES: usize = 8;

/// Read every `(key, value)` pair from a bulk-load file.
pub fn read_pairs(path: &Path) -> Result<Vec<(i32, i32)>> {
    let data = fs::read(path)?;

    if data.len() % PAIR_BYTES != 0 {
        return Err(Error::invalid_argument(format!(
            "load file {} has size {} which is not a multiple of {}",
            path.display(),
            data.len(),
            PAIR_BYTES
        )));
    }

    let mut buf = data.as_slice();
    let mut pairs = Vec::with_capacity(data.len() / PAIR_BYTES);
    while buf.has_remaining() {
        let key = buf.get_i32_ne();
        let value = buf.get_i32_ne();
        pairs.push((key, value));
    }

    Ok(pairs)
}
