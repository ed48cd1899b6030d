//! Core record type for lsmdb.

use std::cmp::Ordering;

use crate::{Error, Result};

/// A single key-value record.
///
/// `deleted = true` marks a tombstone: the record shadows any older value
/// for the same key and is dropped once it reaches the deepest level.
///
/// Ordering and equality compare keys only, so sorted containers of
/// `DataPair` behave like key-indexed maps.
#[derive(Debug, Clone, Copy)]
pub struct DataPair {
    /// The key.
    pub key: i32,
    /// The value. Meaningless when `deleted` is set.
    pub value: i32,
    /// Tombstone flag.
    pub deleted: bool,
}

impl DataPair {
    /// Create a live record.
    pub fn new(key: i32, value: i32) -> Self {
        Self {
            key,
            value,
            deleted: false,
        }
    }

    /// Create a tombstone for `key`.
    pub fn tombstone(key: i32) -> Self {
        Self {
            key,
            value: 0,
            deleted: true,
        }
    }

    /// Check if this record is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }

    /// Encode as a data-file line: `key:value:flag` with `flag` in `{0,1}`.
    pub fn to_line(&self) -> String {
        format!(
            "{}:{}:{}",
            self.key,
            self.value,
            if self.deleted { 1 } else { 0 }
        )
    }

    /// Decode a data-file line.
    pub fn from_line(line: &str) -> Result<Self> {
        let mut fields = line.split(':');

        let key = fields
            .next()
            .and_then(|f| f.parse::<i32>().ok())
            .ok_or_else(|| Error::corruption(format!("bad key in data line: {:?}", line)))?;
        let value = fields
            .next()
            .and_then(|f| f.parse::<i32>().ok())
            .ok_or_else(|| Error::corruption(format!("bad value in data line: {:?}", line)))?;
        let deleted = match fields.next() {
            Some("0") => false,
            Some("1") => true,
            _ => {
                return Err(Error::corruption(format!(
                    "bad tombstone flag in data line: {:?}",
                    line
                )))
            }
        };

        if fields.next().is_some() {
            return Err(Error::corruption(format!(
                "trailing fields in data line: {:?}",
                line
            )));
        }

        Ok(Self {
            key,
            value,
            deleted,
        })
    }
}

impl PartialEq for DataPair {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DataPair {}

impl Ord for DataPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for DataPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_key() {
        let a = DataPair::new(1, 100);
        let b = DataPair::new(2, 50);
        assert!(a < b);

        // Equality ignores value and tombstone flag.
        let c = DataPair::tombstone(1);
        assert_eq!(a, c);
    }

    #[test]
    fn test_line_round_trip() {
        let live = DataPair::new(-42, 7);
        assert_eq!(live.to_line(), "-42:7:0");
        let decoded = DataPair::from_line(&live.to_line()).unwrap();
        assert_eq!(decoded.key, -42);
        assert_eq!(decoded.value, 7);
        assert!(!decoded.deleted);

        let dead = DataPair::tombstone(9);
        assert_eq!(dead.to_line(), "9:0:1");
        assert!(DataPair::from_line(&dead.to_line()).unwrap().deleted);
    }

    #[test]
    fn test_from_line_rejects_garbage() {
        assert!(DataPair::from_line("").is_err());
        assert!(DataPair::from_line("1:2").is_err());
        assert!(DataPair::from_line("1:2:3").is_err());
        assert!(DataPair::from_line("a:2:0").is_err());
        assert!(DataPair::from_line("1:b:1").is_err());
        assert!(DataPair::from_line("1:2:0:extra").is_err());
    }

    #[test]
    fn test_extreme_keys() {
        for key in [i32::MIN, i32::MAX] {
            let pair = DataPair::new(key, key);
            let decoded = DataPair::from_line(&pair.to_line()).unwrap();
            assert_eq!(decoded.key, key);
            assert_eq!(decoded.value, key);
        }
    }
}
