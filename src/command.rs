//! One-letter command parsing and execution.
//!
//! The client speaks a tiny language: `p K V`, `g K`, `r LO HI`, `d K`,
//! `l PATH`, `s`. The first non-space character selects the operation
//! (case-insensitive); the rest of the line is whitespace-separated
//! arguments. Malformed input is rejected without touching the store.

use crate::tree::LsmTree;
use crate::{Error, Result};

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `p K V` - insert or update a key.
    Put { key: i32, value: i32 },
    /// `g K` - look up a key.
    Get { key: i32 },
    /// `r LO HI` - scan the half-open range `[LO, HI)`.
    Range { lo: i32, hi: i32 },
    /// `d K` - delete a key.
    Delete { key: i32 },
    /// `l PATH` - bulk-load binary pairs from a file.
    Load { path: String },
    /// `s` - dump statistics.
    Stats,
}

/// Parse one command line.
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let mut chars = line.chars();
    let op = chars
        .next()
        .ok_or_else(|| Error::invalid_argument("empty command"))?;
    let rest = chars.as_str();

    match op.to_ascii_lowercase() {
        'p' => {
            let args = parse_ints(rest, 2, "p")?;
            Ok(Command::Put {
                key: args[0],
                value: args[1],
            })
        }
        'g' => {
            let args = parse_ints(rest, 1, "g")?;
            Ok(Command::Get { key: args[0] })
        }
        'r' => {
            let args = parse_ints(rest, 2, "r")?;
            if args[1] < args[0] {
                return Err(Error::invalid_argument(
                    "r requires hi to be at least lo",
                ));
            }
            Ok(Command::Range {
                lo: args[0],
                hi: args[1],
            })
        }
        'd' => {
            let args = parse_ints(rest, 1, "d")?;
            Ok(Command::Delete { key: args[0] })
        }
        'l' => {
            let path = rest.trim();
            if path.is_empty() {
                return Err(Error::invalid_argument("l requires a file path"));
            }
            Ok(Command::Load {
                path: path.to_string(),
            })
        }
        's' => {
            if !rest.trim().is_empty() {
                return Err(Error::invalid_argument("s takes no arguments"));
            }
            Ok(Command::Stats)
        }
        other => Err(Error::invalid_argument(format!(
            "unknown command: {:?}",
            other
        ))),
    }
}

/// Run a command against the store and render its response.
pub fn execute_command(tree: &LsmTree, command: Command) -> String {
    match command {
        Command::Put { key, value } => {
            tree.put(key, value);
            "Put: OK".to_string()
        }
        Command::Get { key } => match tree.get(key) {
            Some(value) => format!("Get: Key = {}, Value = {}", key, value),
            None => format!("Get: Key = {} not found", key),
        },
        Command::Range { lo, hi } => {
            let pairs: Vec<String> = tree
                .range(lo, hi)
                .iter()
                .map(|(key, value)| format!("{}:{}", key, value))
                .collect();
            pairs.join(" ")
        }
        Command::Delete { key } => {
            tree.delete(key);
            "Delete: OK".to_string()
        }
        Command::Load { path } => match tree.bulk_load(&path) {
            Ok(count) => format!("Load: {} pairs", count),
            Err(e) => format!("Error: {}", e),
        },
        Command::Stats => tree.stats(),
    }
}

fn parse_ints(rest: &str, arity: usize, op: &str) -> Result<Vec<i32>> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() != arity {
        return Err(Error::invalid_argument(format!(
            "{} requires {} argument{}",
            op,
            arity,
            if arity == 1 { "" } else { "s" }
        )));
    }

    tokens
        .iter()
        .map(|token| {
            token
                .parse::<i32>()
                .map_err(|_| Error::invalid_argument(format!("not an integer: {:?}", token)))
        })
        .collect()
}
