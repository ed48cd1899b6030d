//! K-way merge over sorted runs.
//!
//! The compactor merges every run of a source level into fresh runs for
//! the next level. A min-heap keyed by `(key, source index)` drives the
//! merge; inputs are ordered newest first, so on a key tie the most
//! recent write is popped first and the older duplicates are skipped.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::types::DataPair;

/// One candidate in the merge heap: the head key of a source run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    key: i32,
    source: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merge sorted, duplicate-free runs into sorted output runs.
///
/// `inputs` must be ordered newest first; for each key only the entry
/// from the newest run containing it survives. With `drop_tombstones`
/// set (the output level is the deepest), surviving tombstones are
/// elided instead of written. Output runs are sealed every
/// `max_table_entries` entries.
pub fn merge_runs(
    inputs: &[&[DataPair]],
    drop_tombstones: bool,
    max_table_entries: usize,
) -> Vec<Vec<DataPair>> {
    let max_table_entries = max_table_entries.max(1);

    let mut cursors = vec![0usize; inputs.len()];
    let mut heap = BinaryHeap::with_capacity(inputs.len());
    for (source, run) in inputs.iter().enumerate() {
        debug_assert!(
            run.windows(2).all(|w| w[0].key < w[1].key),
            "merge input must be sorted and duplicate-free"
        );
        if let Some(first) = run.first() {
            heap.push(Reverse(HeapEntry {
                key: first.key,
                source,
            }));
        }
    }

    let mut outputs = Vec::new();
    let mut current = Vec::new();
    let mut last_key: Option<i32> = None;

    while let Some(Reverse(head)) = heap.pop() {
        let pair = inputs[head.source][cursors[head.source]];
        cursors[head.source] += 1;
        if let Some(next) = inputs[head.source].get(cursors[head.source]) {
            heap.push(Reverse(HeapEntry {
                key: next.key,
                source: head.source,
            }));
        }

        // A newer source already emitted this key.
        if last_key == Some(pair.key) {
            continue;
        }
        last_key = Some(pair.key);

        if pair.deleted && drop_tombstones {
            continue;
        }

        current.push(pair);
        if current.len() >= max_table_entries {
            outputs.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        outputs.push(current);
    }
    outputs
}
