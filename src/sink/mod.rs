//! # Result Sink
//!
//! Keyed upsert of the final ranking into a table. A [`Put`] addresses one
//! row and carries `(family, qualifier, value)` cells; writing the same cell
//! twice overwrites it, so re-running a job over identical input leaves
//! identical rows.
//!
//! This is the only stage with side effects, and its failures are fatal.

mod memory;
mod rocks;

pub use memory::MemTable;
pub use rocks::RocksTable;

use crate::config::{SchemaConfig, TableConfig};
use crate::error::SinkError;
use crate::model::{Record, ScoredEntry};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// Qualifier to value map of one row within one family.
pub type Row = BTreeMap<String, Vec<u8>>;

/// One cell of a [`Put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub family: String,
    pub qualifier: String,
    pub value: Vec<u8>,
}

/// Single-row write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    row: Vec<u8>,
    cells: Vec<Cell>,
}

impl Put {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    pub fn add_column(
        mut self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.cells.push(Cell {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        });
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Keyed upsert target for the final ranking.
pub trait ResultSink {
    /// Write every cell of `put`. Cells of one put land together or not at all.
    fn put(&mut self, put: Put) -> Result<(), SinkError>;

    /// Remove every row of `family`.
    fn truncate(&mut self, family: &str) -> Result<(), SinkError>;

    /// Make previous writes durable.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Maps ranked records onto table rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultWriter {
    pub family: String,
    pub id_column: String,
    pub score_column: String,
    pub extra_columns: Vec<String>,
}

impl Default for ResultWriter {
    fn default() -> Self {
        Self::from_config(&TableConfig::default(), &SchemaConfig::default())
    }
}

impl ResultWriter {
    pub fn from_config(table: &TableConfig, schema: &SchemaConfig) -> Self {
        Self {
            family: table.family.clone(),
            id_column: table.id_column.clone(),
            score_column: table.score_column.clone(),
            extra_columns: schema.extra_columns.clone(),
        }
    }

    /// Row for one ranked entry, keyed by the record identity.
    pub fn to_put(&self, entry: &ScoredEntry<Record>) -> Result<Put, SinkError> {
        let record = &entry.payload;
        if record.id.is_empty() {
            return Err(SinkError::EmptyRowKey);
        }
        let mut put = Put::new(record.id.as_bytes())
            .add_column(&self.family, &self.id_column, record.id.as_bytes())
            .add_column(&self.family, &self.score_column, entry.score.to_string());
        for column in &self.extra_columns {
            if let Some(value) = record.field(column) {
                put = put.add_column(&self.family, column, value.as_bytes());
            }
        }
        Ok(put)
    }

    /// Write the final ranking in drain order. Returns the number of distinct
    /// rows written.
    ///
    /// Only the first (best ranked) entry of an identity is written; later
    /// entries with the same row key are skipped so they cannot overwrite it.
    #[instrument(skip(self, sink, result), fields(family = %self.family, rows = result.len()))]
    pub fn write(
        &self,
        sink: &mut dyn ResultSink,
        result: &[ScoredEntry<Record>],
    ) -> Result<usize, SinkError> {
        let mut written: BTreeSet<&str> = BTreeSet::new();
        for (rank, entry) in result.iter().enumerate() {
            if !written.insert(entry.payload.id.as_str()) {
                warn!(rank = rank + 1, id = %entry.payload.id, "skipping repeated row key");
                continue;
            }
            let put = self.to_put(entry)?;
            debug!(rank = rank + 1, id = %entry.payload.id, score = entry.score, "writing row");
            sink.put(put)?;
        }
        sink.flush()?;
        Ok(written.len())
    }
}
