use super::{Put, ResultSink, Row};
use crate::error::SinkError;
use std::collections::BTreeMap;

/// Ordered in-memory table with the same overwrite semantics as
/// [`RocksTable`](super::RocksTable). Used for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemTable {
    families: BTreeMap<String, BTreeMap<Vec<u8>, Row>>,
}

impl MemTable {
    pub fn new<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            families: families
                .into_iter()
                .map(|name| (name.into(), BTreeMap::new()))
                .collect(),
        }
    }

    fn family(&self, family: &str) -> Result<&BTreeMap<Vec<u8>, Row>, SinkError> {
        self.families
            .get(family)
            .ok_or_else(|| SinkError::UnknownFamily(family.to_string()))
    }

    pub fn get_row(&self, family: &str, row: &[u8]) -> Result<Option<Row>, SinkError> {
        Ok(self.family(family)?.get(row).cloned())
    }

    /// All rows of `family` in key order.
    pub fn scan(&self, family: &str) -> Result<Vec<(Vec<u8>, Row)>, SinkError> {
        Ok(self
            .family(family)?
            .iter()
            .map(|(key, row)| (key.clone(), row.clone()))
            .collect())
    }

    pub fn row_count(&self, family: &str) -> Result<usize, SinkError> {
        Ok(self.family(family)?.len())
    }
}

impl ResultSink for MemTable {
    fn put(&mut self, put: Put) -> Result<(), SinkError> {
        if put.row().is_empty() {
            return Err(SinkError::EmptyRowKey);
        }
        // validate every family first so a failed put leaves no partial row
        for cell in put.cells() {
            self.family(&cell.family)?;
        }
        for cell in put.cells {
            if let Some(rows) = self.families.get_mut(&cell.family) {
                rows.entry(put.row.clone())
                    .or_default()
                    .insert(cell.qualifier, cell.value);
            }
        }
        Ok(())
    }

    fn truncate(&mut self, family: &str) -> Result<(), SinkError> {
        self.families
            .get_mut(family)
            .ok_or_else(|| SinkError::UnknownFamily(family.to_string()))?
            .clear();
        Ok(())
    }
}
