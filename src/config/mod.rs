//! Unified configuration for topten jobs.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (topten.toml)
//! ```toml
//! [job]
//! top_k = 10
//! parallelism = 8
//! split_size_bytes = 67108864
//!
//! [schema]
//! id_field = "Id"
//! score_field = "Reputation"
//! extra_columns = ["DisplayName"]
//!
//! [table]
//! path = "/var/lib/topten/topten.db"
//! family = "info"
//! ```
//!
//! Environment variables use the `TOPTEN_` prefix and `__` between sections,
//! e.g. `TOPTEN_JOB__TOP_K=25`.

mod defaults;

pub use defaults::*;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a top-K run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopTenConfig {
    /// Execution parameters
    pub job: JobConfig,
    /// Which record fields carry identity and score
    pub schema: SchemaConfig,
    /// Output table layout
    pub table: TableConfig,
    /// RocksDB tuning (advanced)
    pub storage: StorageConfig,
}

impl TopTenConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - CLI overrides to apply on top
    pub fn load(
        config_path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(TopTenConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with TOPTEN_ prefix
        figment = figment.merge(Env::prefixed("TOPTEN_").split("__"));

        // Layer 3: CLI overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Reject settings no job can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job.parallelism == 0 {
            return Err(ConfigError::Invalid("job.parallelism must be at least 1".into()));
        }
        if self.job.split_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "job.split_size_bytes must be positive".into(),
            ));
        }
        if self.job.merge_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "job.merge_queue_capacity must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("schema.id_field", &self.schema.id_field),
            ("schema.score_field", &self.schema.score_field),
            ("table.family", &self.table.family),
            ("table.id_column", &self.table.id_column),
            ("table.score_column", &self.table.score_column),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if self.table.id_column == self.table.score_column {
            return Err(ConfigError::Invalid(
                "table.id_column and table.score_column must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Execution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Number of records kept per partition and in the final result
    pub top_k: usize,
    /// Reducer threads
    pub parallelism: usize,
    /// Maximum bytes of input handled by one partition
    pub split_size_bytes: u64,
    /// Pending partial results before reducers block
    pub merge_queue_capacity: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            parallelism: default_parallelism(),
            split_size_bytes: DEFAULT_SPLIT_SIZE_BYTES,
            merge_queue_capacity: DEFAULT_MERGE_QUEUE_CAPACITY,
        }
    }
}

/// Record field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Attribute used as identity and output row key
    pub id_field: String,
    /// Attribute parsed as the integer score
    pub score_field: String,
    /// Identities that are never ranked
    pub excluded_ids: Vec<String>,
    /// Extra attributes copied into the output row when present
    pub extra_columns: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            score_field: DEFAULT_SCORE_FIELD.to_string(),
            excluded_ids: vec![DEFAULT_EXCLUDED_ID.to_string()],
            extra_columns: Vec::new(),
        }
    }
}

/// Output table layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Database directory
    pub path: PathBuf,
    /// Column family receiving the rows
    pub family: String,
    /// Qualifier of the identity column
    pub id_column: String,
    /// Qualifier of the score column
    pub score_column: String,
    /// Clear the family before writing
    pub truncate: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TABLE_PATH),
            family: DEFAULT_FAMILY.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            score_column: DEFAULT_SCORE_COLUMN.to_string(),
            truncate: false,
        }
    }
}

/// RocksDB storage configuration (advanced).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Write buffer size in MB
    pub write_buffer_mb: usize,
    /// Maximum number of background compaction threads
    pub max_background_jobs: usize,
    /// fsync the WAL on every write batch
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            write_buffer_mb: DEFAULT_WRITE_BUFFER_MB,
            max_background_jobs: DEFAULT_BACKGROUND_JOBS,
            sync_writes: true,
        }
    }
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Extract(#[from] figment::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
