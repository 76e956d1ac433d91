//! Error types for parsing, persistence and job execution.
//!
//! Record-level problems ([`ParseError`], [`SkipReason`]) are recovered
//! locally: the record is counted and skipped. Sink and input failures
//! ([`SinkError`], [`InputError`]) abort the run through [`JobError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Structural failure while extracting attribute pairs from a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("record is empty or too short ({len} bytes)")]
    TooShort { len: usize },
    #[error("record has no attribute pairs")]
    NoAttributes,
    #[error("record has an unterminated quoted value")]
    UnbalancedQuotes,
    #[error("attribute name {token:?} is not followed by '='")]
    MissingEquals { token: String },
    #[error("attribute with an empty name")]
    EmptyName,
}

/// Why a record was excluded from aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("malformed record: {0}")]
    Malformed(#[from] ParseError),
    #[error("required field '{0}' is missing")]
    MissingField(String),
    #[error("field '{field}' is not an integer score: {value:?}")]
    InvalidScore { field: String, value: String },
    #[error("identity '{0}' is excluded")]
    ExcludedId(String),
}

/// Failure to persist a final entry. Always fatal for the run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unknown column family '{0}'")]
    UnknownFamily(String),
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("table manifest error: {0}")]
    Manifest(String),
    #[error("row key is empty")]
    EmptyRowKey,
}

/// Failure to plan or read an input split.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input path {0} does not exist")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fatal failure of a top-K job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to write results: {0}")]
    Sink(#[from] SinkError),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("merge stage failed: {0}")]
    Merge(String),
}
