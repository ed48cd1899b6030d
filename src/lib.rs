//! # lsmdb
//!
//! An embedded LSM-tree key-value store over fixed-width `i32` keys and
//! values.
//!
//! ## Features
//!
//! - **LSM-Tree Storage**: in-memory write buffer, leveled hierarchy of
//!   immutable SSTables, leveled-tiering compaction
//! - **Background Workers**: one flush thread and one compaction thread
//! - **Fast Negative Lookups**: per-table Bloom filters and sparse fence
//!   pointers
//! - **Concurrent Access**: multiple readers and writers over one tree
//! - **Deletes**: tombstones that propagate through compaction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lsmdb::LsmTree;
//!
//! let tree = LsmTree::open("./my_data")?;
//!
//! tree.put(1, 100);
//! let value = tree.get(1);           // Some(100)
//! let pairs = tree.range(0, 10);     // [(1, 100)]
//! tree.delete(1);
//! ```
//!
//! Durability comes solely from SSTable persistence: a clean close
//! flushes the buffer, but in-flight buffer contents may be lost on a
//! crash.

// Public modules
pub mod command;
pub mod error;
pub mod options;
pub mod types;
pub mod wire;

// Internal modules
mod bloom;
mod buffer;
mod compaction;
mod level;
mod load;
mod sstable;
mod stats;
mod tree;
mod util;

// Re-export main types for convenience
pub use command::{execute_command, parse_command, Command};
pub use error::{Error, Result};
pub use options::{Options, OptionsBuilder};
pub use tree::LsmTree;
pub use types::DataPair;
