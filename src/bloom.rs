//! Bloom filter for SSTable key filtering.
//!
//! A Bloom filter is a probabilistic data structure that can quickly
//! determine if a key is definitely NOT in a set (no false negatives)
//! or might be in the set (possible false positives).
//!
//! Parameters are derived from the expected entry count `n` and a target
//! false-positive rate `p`: `m = ceil(-n * ln p / ln^2 2)` bits and
//! `k = round((m / n) * ln 2)` probes, both clamped to at least 1.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Seed folded into the second probe hash.
const HASH_SEED: u64 = 0x9e37_79b9;

/// Bloom filter over `i32` keys.
///
/// Probe positions use double hashing: `h1 = H(key)`,
/// `h2 = H(h1 ^ seed)`, probe `i` at `(h1 + i * h2) mod m`.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    /// Number of addressable bits.
    num_bits: u64,
    /// Number of hash probes per key.
    num_hashes: u32,
    /// The bit array, packed into bytes.
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Create a filter sized for `items` entries at the given
    /// false-positive rate.
    ///
    /// A filter sized for zero items keeps one clear bit, so every query
    /// answers "definitely absent".
    pub fn with_capacity(items: usize, fp_rate: f64) -> Self {
        let (num_bits, num_hashes) = if items == 0 {
            (1, 1)
        } else {
            let n = items as f64;
            let ln2 = std::f64::consts::LN_2;
            let m = (-(n * fp_rate.ln()) / (ln2 * ln2)).ceil().max(1.0);
            let k = ((m / n) * ln2).round().max(1.0);
            (m as u64, k as u32)
        };

        let num_bytes = num_bits.div_ceil(8) as usize;
        Self {
            num_bits,
            num_hashes,
            bits: vec![0u8; num_bytes],
        }
    }

    /// Add a key to the filter.
    pub fn add(&mut self, key: i32) {
        let (h1, h2) = Self::probe_hashes(key);
        for i in 0..self.num_hashes {
            let bit = h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits;
            self.set_bit(bit);
        }
    }

    /// Check if a key might be in the filter.
    ///
    /// Returns true if the key might exist (possible false positive).
    /// Returns false if the key definitely does not exist.
    pub fn might_contain(&self, key: i32) -> bool {
        let (h1, h2) = Self::probe_hashes(key);
        for i in 0..self.num_hashes {
            let bit = h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits;
            if !self.get_bit(bit) {
                return false;
            }
        }
        true
    }

    /// Get the number of addressable bits.
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Get the number of hash probes.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Encode to the on-disk format: `u64 m | u64 k | ceil(m/8) bit bytes`,
    /// little-endian.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16 + self.bits.len());
        buf.put_u64_le(self.num_bits);
        buf.put_u64_le(self.num_hashes as u64);
        buf.put_slice(&self.bits);
        buf.freeze()
    }

    /// Decode from the on-disk format.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::corruption("Bloom filter header truncated"));
        }

        let num_bits = data.get_u64_le();
        let num_hashes = data.get_u64_le();
        if num_bits == 0 || num_hashes == 0 || num_hashes > u32::MAX as u64 {
            return Err(Error::corruption("Bloom filter parameters out of range"));
        }

        let num_bytes = num_bits.div_ceil(8) as usize;
        if data.len() < num_bytes {
            return Err(Error::corruption("short read of Bloom filter bits"));
        }

        Ok(Self {
            num_bits,
            num_hashes: num_hashes as u32,
            bits: data[..num_bytes].to_vec(),
        })
    }

    /// Write the encoded filter to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Read a filter from `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist; the caller
    /// reconstructs the filter from table data on first full load.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Self::decode(&data)?))
    }

    /// Compute the two double-hashing bases for a key.
    fn probe_hashes(key: i32) -> (u64, u64) {
        let h1 = mix64(key as u64);
        let h2 = mix64(h1 ^ HASH_SEED);
        (h1, h2)
    }

    fn set_bit(&mut self, bit_index: u64) {
        assert!(bit_index < self.num_bits, "Bloom bit index out of range");
        self.bits[(bit_index / 8) as usize] |= 1 << (bit_index % 8);
    }

    fn get_bit(&self, bit_index: u64) -> bool {
        assert!(bit_index < self.num_bits, "Bloom bit index out of range");
        self.bits[(bit_index / 8) as usize] & (1 << (bit_index % 8)) != 0
    }
}

/// Stable 64-bit integer hash (splitmix64 finalizer).
///
/// Must produce identical output on add and query across process runs,
/// since filters are persisted to disk.
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_FALSE_POSITIVE_RATE;

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = BloomFilter::with_capacity(0, DEFAULT_FALSE_POSITIVE_RATE);
        assert_eq!(filter.num_bits(), 1);
        assert_eq!(filter.num_hashes(), 1);
        assert!(!filter.might_contain(0));
        assert!(!filter.might_contain(42));
    }

    #[test]
    fn test_added_keys_always_contained() {
        let mut filter = BloomFilter::with_capacity(1000, DEFAULT_FALSE_POSITIVE_RATE);
        for key in -500..500 {
            filter.add(key);
        }
        for key in -500..500 {
            assert!(filter.might_contain(key), "key {} not found", key);
        }
    }

    #[test]
    fn test_false_positive_rate() {
        let mut filter = BloomFilter::with_capacity(1000, DEFAULT_FALSE_POSITIVE_RATE);
        for key in 0..1000 {
            filter.add(key);
        }

        let mut false_positives = 0;
        for key in 1000..11000 {
            if filter.might_contain(key) {
                false_positives += 1;
            }
        }

        // Target is 1%; allow some margin.
        let fp_rate = false_positives as f64 / 10_000.0;
        assert!(
            fp_rate < 0.03,
            "false positive rate too high: {:.2}%",
            fp_rate * 100.0
        );
    }

    #[test]
    fn test_parameter_derivation() {
        // n = 100, p = 0.01: m = ceil(100 * 4.60517 / 0.48045) = 959, k = round(9.59 * 0.693) = 7
        let filter = BloomFilter::with_capacity(100, 0.01);
        assert_eq!(filter.num_bits(), 959);
        assert_eq!(filter.num_hashes(), 7);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut filter = BloomFilter::with_capacity(50, 0.01);
        for key in [i32::MIN, -7, 0, 3, i32::MAX] {
            filter.add(key);
        }

        let decoded = BloomFilter::decode(&filter.encode()).unwrap();
        assert_eq!(decoded.num_bits(), filter.num_bits());
        assert_eq!(decoded.num_hashes(), filter.num_hashes());
        for key in [i32::MIN, -7, 0, 3, i32::MAX] {
            assert!(decoded.might_contain(key));
        }
    }

    #[test]
    fn test_decode_short_read() {
        let mut filter = BloomFilter::with_capacity(100, 0.01);
        filter.add(1);
        let encoded = filter.encode();

        assert!(BloomFilter::decode(&encoded[..8]).is_err());
        assert!(BloomFilter::decode(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn test_file_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000001.sst.bf");

        assert!(BloomFilter::read_from(&path).unwrap().is_none());

        let mut filter = BloomFilter::with_capacity(10, 0.01);
        filter.add(99);
        filter.write_to(&path).unwrap();

        let loaded = BloomFilter::read_from(&path).unwrap().unwrap();
        assert!(loaded.might_contain(99));
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(mix64(0x1234_5678), mix64(0x1234_5678));
        assert_ne!(mix64(1), mix64(2));
    }
}
