//! # Partition Reducer
//!
//! Local top-K of one partition. Each reducer owns its container exclusively:
//! no locks, no state shared with other partitions, O(K) memory however large
//! the partition is.

use crate::error::SkipReason;
use crate::model::{PartitionResult, Record, ScoredEntry};
use crate::parser::RecordParser;
use crate::topk::BoundedTopK;
use serde::Serialize;
use std::ops::AddAssign;
use tracing::debug;

/// Record counters of one partition (or, summed, of a whole job).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub records_seen: u64,
    pub records_accepted: u64,
    pub skipped_malformed: u64,
    pub skipped_missing_field: u64,
    pub skipped_invalid_score: u64,
    pub skipped_excluded: u64,
}

impl PartitionStats {
    pub fn records_skipped(&self) -> u64 {
        self.skipped_malformed
            + self.skipped_missing_field
            + self.skipped_invalid_score
            + self.skipped_excluded
    }

    fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::Malformed(_) => self.skipped_malformed += 1,
            SkipReason::MissingField(_) => self.skipped_missing_field += 1,
            SkipReason::InvalidScore { .. } => self.skipped_invalid_score += 1,
            SkipReason::ExcludedId(_) => self.skipped_excluded += 1,
        }
    }
}

impl AddAssign for PartitionStats {
    fn add_assign(&mut self, other: Self) {
        self.records_seen += other.records_seen;
        self.records_accepted += other.records_accepted;
        self.skipped_malformed += other.skipped_malformed;
        self.skipped_missing_field += other.skipped_missing_field;
        self.skipped_invalid_score += other.skipped_invalid_score;
        self.skipped_excluded += other.skipped_excluded;
    }
}

/// Streams the records of one partition into a private [`BoundedTopK`].
pub struct PartitionReducer<'a> {
    parser: &'a RecordParser,
    top: BoundedTopK<Record>,
    stats: PartitionStats,
}

impl<'a> PartitionReducer<'a> {
    pub fn new(parser: &'a RecordParser, k: usize) -> Self {
        Self {
            parser,
            top: BoundedTopK::new(k),
            stats: PartitionStats::default(),
        }
    }

    /// Feed one raw record. Invalid records are counted and skipped; a repeated
    /// identity keeps only its best entry.
    pub fn push(&mut self, raw: &str) {
        self.stats.records_seen += 1;
        match self.parser.parse(raw) {
            Ok(record) => {
                self.stats.records_accepted += 1;
                self.top
                    .insert_unique_by(ScoredEntry::new(record.score, record), Record::same_identity);
            }
            Err(reason) => {
                debug!(%reason, record = %truncate(raw, 120), "skipping record");
                self.stats.record_skip(&reason);
            }
        }
    }

    pub fn stats(&self) -> &PartitionStats {
        &self.stats
    }

    /// End of partition: the local top-K, best first.
    pub fn finish(mut self) -> (PartitionResult, PartitionStats) {
        (self.top.drain(), self.stats)
    }

    /// Reduce a whole partition in one call.
    pub fn reduce<I, S>(parser: &'a RecordParser, k: usize, records: I) -> (PartitionResult, PartitionStats)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut reducer = Self::new(parser, k);
        for raw in records {
            reducer.push(raw.as_ref());
        }
        reducer.finish()
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RecordSchema;

    fn parser() -> RecordParser {
        RecordParser::new(RecordSchema::new("Id", "Score"))
    }

    fn row(id: &str, score: i64) -> String {
        format!(r#"<row Id="{id}" Score="{score}" />"#)
    }

    fn ids(result: &PartitionResult) -> Vec<&str> {
        result.iter().map(|e| e.payload.id.as_str()).collect()
    }

    #[test]
    fn local_top_k_of_partition() {
        let parser = parser();
        let (result, stats) =
            PartitionReducer::reduce(&parser, 2, [row("A", 5), row("B", 9)]);
        assert_eq!(ids(&result), vec!["B", "A"]);
        assert_eq!(result[0].score, 9);
        assert_eq!(stats.records_accepted, 2);
    }

    #[test]
    fn malformed_records_do_not_change_result() {
        let parser = parser();
        let clean = vec![row("1", 10), row("2", 30), row("3", 20)];
        let mut dirty = vec![
            "<users>".to_string(),
            r#"<row Id="x" Score="NaN" />"#.to_string(),
        ];
        dirty.extend(clean.iter().cloned());
        dirty.push(r#"<row Score="99" />"#.to_string());
        dirty.push(r#"<row Id="broken Score="1" />"#.to_string());
        dirty.push(String::new());

        let (expected, _) = PartitionReducer::reduce(&parser, 2, &clean);
        let (actual, stats) = PartitionReducer::reduce(&parser, 2, &dirty);
        assert_eq!(actual, expected);
        assert_eq!(stats.records_seen, 8);
        assert_eq!(stats.records_accepted, 3);
        assert_eq!(stats.skipped_malformed, 3);
        assert_eq!(stats.skipped_invalid_score, 1);
        assert_eq!(stats.skipped_missing_field, 1);
        assert_eq!(stats.records_skipped(), 5);
    }

    #[test]
    fn repeated_identity_takes_one_slot() {
        let parser = parser();
        let rows = [row("A", 9), row("A", 9), row("A", 4), row("B", 5)];
        let (result, stats) = PartitionReducer::reduce(&parser, 2, rows);
        assert_eq!(ids(&result), vec!["A", "B"]);
        assert_eq!(result[0].score, 9);
        assert_eq!(stats.records_accepted, 4);
    }

    #[test]
    fn empty_partition_yields_empty_result() {
        let parser = parser();
        let (result, stats) = PartitionReducer::reduce(&parser, 10, Vec::<String>::new());
        assert!(result.is_empty());
        assert_eq!(stats, PartitionStats::default());
    }

    #[test]
    fn stats_add_up() {
        let mut total = PartitionStats::default();
        total += PartitionStats {
            records_seen: 3,
            records_accepted: 2,
            skipped_malformed: 1,
            ..Default::default()
        };
        total += PartitionStats {
            records_seen: 1,
            skipped_excluded: 1,
            ..Default::default()
        };
        assert_eq!(total.records_seen, 4);
        assert_eq!(total.records_skipped(), 2);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
