//! Statistics report over the logical contents of the tree.
//!
//! The report attributes every live key to its winning source (the
//! buffer or the level the read path would serve it from) and renders a
//! deterministic dump:
//!
//! ```text
//! Logical Pairs: 3
//! BUF: 1, L1: 2
//! 7:70:BUF
//! 1:10:L1 3:30:L1
//! ```

use std::fmt;

/// Where a key's winning record lives.
///
/// Sources order by read priority: the buffer first, then levels top
/// down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    /// The in-memory write buffer.
    Buffer,
    /// A level, 0-indexed.
    Level(usize),
}

impl Source {
    /// Render the label used in the dump: `BUF`, `L1`, `L2`, ...
    fn label(&self) -> String {
        match self {
            Source::Buffer => "BUF".to_string(),
            Source::Level(level) => format!("L{}", level + 1),
        }
    }
}

/// A per-source population report.
#[derive(Debug)]
pub struct StatsReport {
    /// Non-empty sources in priority order, keys ascending within each.
    groups: Vec<(Source, Vec<(i32, i32)>)>,
}

impl StatsReport {
    /// Build a report from the live winning records.
    pub fn new(mut winners: Vec<(Source, i32, i32)>) -> Self {
        winners.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut groups: Vec<(Source, Vec<(i32, i32)>)> = Vec::new();
        for (source, key, value) in winners {
            match groups.last_mut() {
                Some((last, pairs)) if *last == source => pairs.push((key, value)),
                _ => groups.push((source, vec![(key, value)])),
            }
        }

        Self { groups }
    }

    /// Count of non-tombstoned distinct keys across the tree.
    pub fn logical_pairs(&self) -> usize {
        self.groups.iter().map(|(_, pairs)| pairs.len()).sum()
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logical Pairs: {}", self.logical_pairs())?;

        if self.groups.is_empty() {
            return Ok(());
        }

        let counts: Vec<String> = self
            .groups
            .iter()
            .map(|(source, pairs)| format!("{}: {}", source.label(), pairs.len()))
            .collect();
        write!(f, "\n{}", counts.join(", "))?;

        for (source, pairs) in &self.groups {
            let label = source.label();
            let line: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{}:{}:{}", key, value, label))
                .collect();
            write!(f, "\n{}", line.join(" "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = StatsReport::new(Vec::new());
        assert_eq!(report.logical_pairs(), 0);
        assert_eq!(report.to_string(), "Logical Pairs: 0");
    }

    #[test]
    fn test_grouping_and_format() {
        let report = StatsReport::new(vec![
            (Source::Level(0), 3, 30),
            (Source::Buffer, 7, 70),
            (Source::Level(0), 1, 10),
        ]);

        assert_eq!(report.logical_pairs(), 3);
        assert_eq!(
            report.to_string(),
            "Logical Pairs: 3\nBUF: 1, L1: 2\n7:70:BUF\n1:10:L1 3:30:L1"
        );
    }

    #[test]
    fn test_source_priority_order() {
        let report = StatsReport::new(vec![
            (Source::Level(2), 1, 1),
            (Source::Buffer, 2, 2),
            (Source::Level(1), 3, 3),
        ]);

        assert_eq!(
            report.to_string(),
            "Logical Pairs: 3\nBUF: 1, L2: 1, L3: 1\n2:2:BUF\n3:3:L2\n1:1:L3"
        );
    }

    #[test]
    fn test_deterministic() {
        let winners = vec![
            (Source::Buffer, 5, 50),
            (Source::Buffer, 1, 10),
            (Source::Level(0), 2, 20),
        ];
        let a = StatsReport::new(winners.clone()).to_string();
        let b = StatsReport::new(winners).to_string();
        assert_eq!(a, b);
    }
}
