//! # Data Model
//!
//! Parsed records, scored entries and the partial/final result sequences
//! exchanged between the reduction and merge stages.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to field value mapping extracted from one raw record.
pub type Fields = BTreeMap<String, String>;

/// A valid record: identity and score already resolved, remaining fields kept
/// as the payload.
///
/// Ordering is derived (identity, then score, then fields) and serves as the
/// tie-break among entries with equal score.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub score: i64,
    pub fields: Fields,
}

impl Record {
    pub fn new(id: impl Into<String>, score: i64, fields: Fields) -> Self {
        Self {
            id: id.into(),
            score,
            fields,
        }
    }

    /// Whether both records describe the same entity.
    pub fn same_identity(&self, other: &Record) -> bool {
        self.id == other.id
    }

    /// Look up any field of the original record.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.score)
    }
}

/// A payload paired with its score.
///
/// `Ord` ranks entries: a greater entry is a better one. Higher score wins;
/// on equal score the smaller payload wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoredEntry<T> {
    pub score: i64,
    pub payload: T,
}

impl<T> ScoredEntry<T> {
    pub fn new(score: i64, payload: T) -> Self {
        Self { score, payload }
    }
}

impl<T: Ord> Ord for ScoredEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.payload.cmp(&self.payload))
    }
}

impl<T: Ord> PartialOrd for ScoredEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Local top-K of one partition, best first. Carries no partition identity.
pub type PartitionResult = Vec<ScoredEntry<Record>>;

/// Global top-K, best first. Drain order is the persisted rank.
pub type FinalResult = Vec<ScoredEntry<Record>>;
