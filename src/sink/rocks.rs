use super::{Put, ResultSink, Row};
use crate::config::StorageConfig;
use crate::error::SinkError;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

const CF_METADATA: &str = "metadata";
const KEY_MANIFEST: &[u8] = b"manifest";
const TABLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct TableManifest {
    format_version: u32,
    app_version: String,
    families: Vec<String>,
}

/// RocksDB-backed table. Each logical family is a column family; a cell is
/// stored under `u32-BE(len(row)) ‖ row ‖ qualifier`, so the cells of a row
/// are contiguous and rows sort by key.
pub struct RocksTable {
    db: DB,
    families: BTreeSet<String>,
    write_options: WriteOptions,
}

impl RocksTable {
    pub fn open<I, S>(path: impl AsRef<Path>, families: I) -> Result<Self, SinkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::open_with_options(path, families, &StorageConfig::default())
    }

    pub fn open_with_options<I, S>(
        path: impl AsRef<Path>,
        families: I,
        storage: &StorageConfig,
    ) -> Result<Self, SinkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.as_ref();
        let mut wanted: BTreeSet<String> = families.into_iter().map(Into::into).collect();
        if wanted.contains(CF_METADATA) {
            return Err(SinkError::Manifest(format!(
                "column family name '{CF_METADATA}' is reserved"
            )));
        }

        let options = db_options(storage);
        // every existing family must be opened, not only the requested ones
        if let Ok(existing) = DB::list_cf(&options, path) {
            wanted.extend(
                existing
                    .into_iter()
                    .filter(|name| name != CF_METADATA && name != rocksdb::DEFAULT_COLUMN_FAMILY_NAME),
            );
        }

        let mut descriptors = vec![ColumnFamilyDescriptor::new(CF_METADATA, Options::default())];
        descriptors.extend(
            wanted
                .iter()
                .map(|name| ColumnFamilyDescriptor::new(name, Options::default())),
        );
        let db = DB::open_cf_descriptors(&options, path, descriptors)?;
        validate_or_init_manifest(&db, &wanted)?;

        let mut write_options = WriteOptions::default();
        write_options.set_sync(storage.sync_writes);

        info!(path = %path.display(), families = ?wanted, "opened table");
        Ok(Self {
            db,
            families: wanted,
            write_options,
        })
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(String::as_str)
    }

    fn cf(&self, family: &str) -> Result<&rocksdb::ColumnFamily, SinkError> {
        if !self.families.contains(family) {
            return Err(SinkError::UnknownFamily(family.to_string()));
        }
        self.db
            .cf_handle(family)
            .ok_or_else(|| SinkError::UnknownFamily(family.to_string()))
    }

    pub fn get_row(&self, family: &str, row: &[u8]) -> Result<Option<Row>, SinkError> {
        let cf = self.cf(family)?;
        let prefix = encode_row_prefix(row);
        let mut out = Row::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let qualifier = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            out.insert(qualifier, value.to_vec());
        }
        Ok(if out.is_empty() { None } else { Some(out) })
    }

    /// All rows of `family` in key order.
    pub fn scan(&self, family: &str) -> Result<Vec<(Vec<u8>, Row)>, SinkError> {
        let cf = self.cf(family)?;
        let mut rows: Vec<(Vec<u8>, Row)> = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let (row, qualifier) = decode_cell_key(&key).ok_or_else(|| {
                SinkError::Manifest(format!("corrupt cell key in family '{family}'"))
            })?;
            let same_row = rows.last().is_some_and(|(last, _)| last.as_slice() == row);
            if !same_row {
                rows.push((row.to_vec(), Row::new()));
            }
            if let Some((_, cells)) = rows.last_mut() {
                cells.insert(qualifier, value.to_vec());
            }
        }
        Ok(rows)
    }
}

impl ResultSink for RocksTable {
    fn put(&mut self, put: Put) -> Result<(), SinkError> {
        if put.row().is_empty() {
            return Err(SinkError::EmptyRowKey);
        }
        let mut batch = WriteBatch::default();
        for cell in put.cells() {
            let cf = self.cf(&cell.family)?;
            batch.put_cf(cf, encode_cell_key(put.row(), &cell.qualifier), &cell.value);
        }
        self.db.write_opt(batch, &self.write_options)?;
        Ok(())
    }

    fn truncate(&mut self, family: &str) -> Result<(), SinkError> {
        let cf = self.cf(family)?;
        let keys: Vec<Box<[u8]>> = self
            .db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|entry| entry.map(|(key, _)| key))
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Ok(());
        }
        debug!(family, cells = keys.len(), "truncating family");
        let mut batch = WriteBatch::default();
        for key in keys {
            batch.delete_cf(cf, key);
        }
        self.db.write_opt(batch, &self.write_options)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        for family in &self.families {
            let cf = self.cf(family)?;
            self.db.flush_cf(cf)?;
        }
        Ok(())
    }
}

fn db_options(storage: &StorageConfig) -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options.set_paranoid_checks(true);
    options.set_write_buffer_size(storage.write_buffer_mb.max(1) * 1024 * 1024);
    options.set_max_background_jobs(storage.max_background_jobs.max(1) as i32);
    options
}

fn validate_or_init_manifest(db: &DB, families: &BTreeSet<String>) -> Result<(), SinkError> {
    let metadata_cf = db
        .cf_handle(CF_METADATA)
        .ok_or_else(|| SinkError::UnknownFamily(CF_METADATA.to_string()))?;
    if let Some(bytes) = db.get_cf(metadata_cf, KEY_MANIFEST)? {
        let manifest: TableManifest =
            bincode::deserialize(&bytes).map_err(|e| SinkError::Manifest(e.to_string()))?;
        if manifest.format_version != TABLE_FORMAT_VERSION {
            return Err(SinkError::Manifest(format!(
                "table format version mismatch: expected {}, found {}",
                TABLE_FORMAT_VERSION, manifest.format_version
            )));
        }
        if manifest.families.iter().eq(families.iter()) {
            return Ok(());
        }
    }

    let manifest = TableManifest {
        format_version: TABLE_FORMAT_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        families: families.iter().cloned().collect(),
    };
    let bytes = bincode::serialize(&manifest).map_err(|e| SinkError::Manifest(e.to_string()))?;
    db.put_cf(metadata_cf, KEY_MANIFEST, bytes)?;
    Ok(())
}

fn encode_row_prefix(row: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + row.len());
    key.extend_from_slice(&(row.len() as u32).to_be_bytes());
    key.extend_from_slice(row);
    key
}

fn encode_cell_key(row: &[u8], qualifier: &str) -> Vec<u8> {
    let mut key = encode_row_prefix(row);
    key.extend_from_slice(qualifier.as_bytes());
    key
}

fn decode_cell_key(key: &[u8]) -> Option<(&[u8], String)> {
    let len_bytes: [u8; 4] = key.get(..4)?.try_into().ok()?;
    let row_len = u32::from_be_bytes(len_bytes) as usize;
    let row = key.get(4..4 + row_len)?;
    let qualifier = String::from_utf8_lossy(&key[4 + row_len..]).into_owned();
    Some((row, qualifier))
}
