//! Configuration options for lsmdb.

/// Default number of entries the write buffer holds before a flush.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;

/// Default number of SSTables level 0 holds before compaction.
pub const DEFAULT_BASE_LEVEL_TABLE_CAPACITY: usize = 5;

/// Default geometric multiplier on table capacity per level depth.
pub const DEFAULT_LEVEL_SIZE_RATIO: usize = 10;

/// Default number of levels in the tree.
pub const DEFAULT_TOTAL_LEVELS: usize = 7;

/// Default number of entries per fence-pointer block.
pub const DEFAULT_BLOCK_ENTRIES: usize = 170;

/// Default Bloom filter false-positive rate.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Default maximum number of entries in a single compaction output table.
pub const DEFAULT_MAX_TABLE_ENTRIES: usize = 1_000_000;

/// Store configuration options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of entries in the write buffer.
    pub buffer_capacity: usize,

    /// Number of SSTables level 0 holds before compaction triggers.
    pub base_level_table_capacity: usize,

    /// Geometric multiplier on table capacity per level depth.
    pub level_size_ratio: usize,

    /// Total number of levels.
    pub total_levels: usize,

    /// Number of entries covered by one fence pointer.
    pub block_entries: usize,

    /// Target Bloom filter false-positive rate.
    pub bloom_fp_rate: f64,

    /// Maximum number of entries per compaction output table.
    pub max_table_entries: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            base_level_table_capacity: DEFAULT_BASE_LEVEL_TABLE_CAPACITY,
            level_size_ratio: DEFAULT_LEVEL_SIZE_RATIO,
            total_levels: DEFAULT_TOTAL_LEVELS,
            block_entries: DEFAULT_BLOCK_ENTRIES,
            bloom_fp_rate: DEFAULT_FALSE_POSITIVE_RATE,
            max_table_entries: DEFAULT_MAX_TABLE_ENTRIES,
        }
    }
}

impl Options {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the options.
    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer_capacity == 0 {
            return Err(crate::Error::invalid_argument(
                "buffer_capacity must be at least 1",
            ));
        }

        if self.base_level_table_capacity == 0 {
            return Err(crate::Error::invalid_argument(
                "base_level_table_capacity must be at least 1",
            ));
        }

        if self.level_size_ratio == 0 {
            return Err(crate::Error::invalid_argument(
                "level_size_ratio must be at least 1",
            ));
        }

        if self.total_levels == 0 {
            return Err(crate::Error::invalid_argument(
                "total_levels must be at least 1",
            ));
        }

        if self.block_entries == 0 {
            return Err(crate::Error::invalid_argument(
                "block_entries must be at least 1",
            ));
        }

        if !(self.bloom_fp_rate > 0.0 && self.bloom_fp_rate < 1.0) {
            return Err(crate::Error::invalid_argument(
                "bloom_fp_rate must be in (0, 1)",
            ));
        }

        if self.max_table_entries == 0 {
            return Err(crate::Error::invalid_argument(
                "max_table_entries must be at least 1",
            ));
        }

        Ok(())
    }

    /// Calculate the table capacity for a given level.
    pub fn table_capacity_for_level(&self, level: usize) -> usize {
        let mut capacity = self.base_level_table_capacity;
        for _ in 0..level {
            capacity = capacity.saturating_mul(self.level_size_ratio);
        }
        capacity
    }
}

/// Builder for Options.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the write buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.buffer_capacity = capacity;
        self
    }

    /// Set the level-0 table capacity.
    pub fn base_level_table_capacity(mut self, capacity: usize) -> Self {
        self.options.base_level_table_capacity = capacity;
        self
    }

    /// Set the level size ratio.
    pub fn level_size_ratio(mut self, ratio: usize) -> Self {
        self.options.level_size_ratio = ratio;
        self
    }

    /// Set the total number of levels.
    pub fn total_levels(mut self, levels: usize) -> Self {
        self.options.total_levels = levels;
        self
    }

    /// Set the number of entries per fence-pointer block.
    pub fn block_entries(mut self, entries: usize) -> Self {
        self.options.block_entries = entries;
        self
    }

    /// Set the Bloom filter false-positive rate.
    pub fn bloom_fp_rate(mut self, rate: f64) -> Self {
        self.options.bloom_fp_rate = rate;
        self
    }

    /// Set the maximum entries per compaction output table.
    pub fn max_table_entries(mut self, entries: usize) -> Self {
        self.options.max_table_entries = entries;
        self
    }

    /// Build the options.
    pub fn build(self) -> crate::Result<Options> {
        self.options.validate()?;
        Ok(self.options)
    }
}
