//! Concurrency stress tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use lsmdb::{LsmTree, Options, OptionsBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

fn stress_options() -> Options {
    OptionsBuilder::new()
        .buffer_capacity(16)
        .base_level_table_capacity(2)
        .level_size_ratio(2)
        .total_levels(7)
        .block_entries(8)
        .build()
        .unwrap()
}

/// Concurrent writers over disjoint key ranges with racing readers.
///
/// Every value written for key `k` equals `k`, so a reader can verify
/// it never observes a value that was never put.
#[test]
fn stress_concurrent_writers_and_readers() {
    const WRITERS: i32 = 4;
    const KEYS_PER_WRITER: i32 = 500;

    let dir = TempDir::new().unwrap();
    let tree = Arc::new(LsmTree::open_with_options(dir.path(), stress_options()).unwrap());

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            let base = writer * 10_000;
            for i in 0..KEYS_PER_WRITER {
                tree.put(base + i, base + i);
            }
        }));
    }
    for reader in 0..2 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(7 + reader);
            for _ in 0..2_000 {
                let key = rng.random_range(0..WRITERS * 10_000);
                if let Some(value) = tree.get(key) {
                    assert_eq!(value, key, "observed a value that was never put");
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    tree.wait_for_background_work();

    for writer in 0..WRITERS {
        let base = writer * 10_000;
        for i in 0..KEYS_PER_WRITER {
            assert_eq!(tree.get(base + i), Some(base + i));
        }
    }
}

/// Per-key serializability: each writer owns its keys and finishes with
/// a known last operation, which must be what any later read observes.
#[test]
fn stress_put_delete_interleaving() {
    const WRITERS: i32 = 3;
    const KEYS_PER_WRITER: i32 = 50;
    const ROUNDS: i32 = 20;

    let dir = TempDir::new().unwrap();
    let tree = Arc::new(LsmTree::open_with_options(dir.path(), stress_options()).unwrap());

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            let base = writer * 1_000;
            for round in 0..ROUNDS {
                for i in 0..KEYS_PER_WRITER {
                    let key = base + i;
                    tree.put(key, round * 100 + i);
                    if i % 3 == 0 {
                        tree.delete(key);
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    tree.wait_for_background_work();

    // The last round's operations win, in program order per key.
    for writer in 0..WRITERS {
        let base = writer * 1_000;
        for i in 0..KEYS_PER_WRITER {
            let expected = if i % 3 == 0 {
                None
            } else {
                Some((ROUNDS - 1) * 100 + i)
            };
            assert_eq!(tree.get(base + i), expected, "key {}", base + i);
        }
    }
}

/// Random single-threaded workload checked against a model map, with
/// periodic forced flushes and a reopen at the end.
#[test]
fn stress_random_ops_match_model() {
    let dir = TempDir::new().unwrap();
    let mut model: BTreeMap<i32, i32> = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(0xdb);

    {
        let tree = LsmTree::open_with_options(dir.path(), stress_options()).unwrap();

        for op in 0..3_000 {
            let key = rng.random_range(0..200);
            if rng.random_range(0..10) < 7 {
                let value = rng.random_range(-1_000..1_000);
                tree.put(key, value);
                model.insert(key, value);
            } else {
                tree.delete(key);
                model.remove(&key);
            }

            if op % 500 == 499 {
                tree.flush();
            }
        }

        tree.wait_for_background_work();
        for key in 0..200 {
            assert_eq!(tree.get(key), model.get(&key).copied(), "key {}", key);
        }
        let expected: Vec<(i32, i32)> = model
            .range(50..150)
            .map(|(&k, &v)| (k, v))
            .collect();
        assert_eq!(tree.range(50, 150), expected);

        tree.close();
    }

    let tree = LsmTree::open_with_options(dir.path(), stress_options()).unwrap();
    for key in 0..200 {
        assert_eq!(tree.get(key), model.get(&key).copied(), "key {}", key);
    }
}
