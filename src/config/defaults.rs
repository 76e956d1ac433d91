//! Default constants for topten configuration.
//!
//! All magic numbers are centralized here with documentation.

// =============================================================================
// Job Defaults
// =============================================================================

/// Number of records kept by every top-K stage
pub const DEFAULT_TOP_K: usize = 10;

/// Default split size in bytes (128MB, one HDFS block)
/// A file larger than this is read by several partitions in parallel.
pub const DEFAULT_SPLIT_SIZE_BYTES: u64 = 128 * 1024 * 1024;

/// Capacity of the partition-to-merge channel
/// Reducers block once this many partial results are waiting for the merger.
pub const DEFAULT_MERGE_QUEUE_CAPACITY: usize = 64;

/// Default number of reducer threads
/// Uses number of CPU cores for optimal parallelism.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(8)
}

// =============================================================================
// Record Schema Defaults
// =============================================================================

/// Attribute holding the record identity (row key of the output)
pub const DEFAULT_ID_FIELD: &str = "Id";

/// Attribute holding the integer score
pub const DEFAULT_SCORE_FIELD: &str = "Reputation";

/// Identity of the synthetic community account, never ranked
pub const DEFAULT_EXCLUDED_ID: &str = "-1";

// =============================================================================
// Table Defaults
// =============================================================================

/// Default table directory
pub const DEFAULT_TABLE_PATH: &str = "topten.db";

/// Column family receiving the ranked rows
pub const DEFAULT_FAMILY: &str = "info";

/// Qualifier of the identity column
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Qualifier of the score column
pub const DEFAULT_SCORE_COLUMN: &str = "score";

// =============================================================================
// Storage Defaults (RocksDB)
// =============================================================================

/// Default write buffer size in MB
/// The output is tiny; a small buffer keeps the footprint low.
pub const DEFAULT_WRITE_BUFFER_MB: usize = 8;

/// Default number of background compaction jobs
pub const DEFAULT_BACKGROUND_JOBS: usize = 2;
