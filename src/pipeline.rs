//! # Top-K Job Pipeline
//!
//! Two-phase execution over independent partitions.
//!
//! ## Architecture
//!
//! ```text
//! Partition 0   Partition 1   ...   Partition N      (rayon pool, no shared state)
//! (reducer)     (reducer)           (reducer)
//!     │             │                   │
//!     └─────────────┴─────────┬─────────┘
//!                             ▼
//!                  bounded crossbeam channel
//!                             │
//!                   ┌─────────▼─────────┐
//!                   │   GlobalMerger    │   (exactly one thread)
//!                   └─────────┬─────────┘
//!                             ▼
//!                        ResultSink
//! ```
//!
//! Every reducer holds O(K) entries. The merger is the only consumer of the
//! channel, so all partial results converge in one place.

use crate::config::TopTenConfig;
use crate::error::JobError;
use crate::input::{plan_splits, PartitionSource};
use crate::merger::GlobalMerger;
use crate::model::{FinalResult, PartitionResult};
use crate::parser::{RecordParser, RecordSchema};
use crate::reducer::{PartitionReducer, PartitionStats};
use crate::sink::{ResultSink, ResultWriter};
use crossbeam_channel::bounded;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Output of the reduction and merge phases, before anything is written.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub result: FinalResult,
    pub stats: PartitionStats,
    pub partitions: usize,
}

/// One persisted row of the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    pub id: String,
    pub score: i64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub partitions: usize,
    pub records: PartitionStats,
    pub rows_written: usize,
    pub elapsed_ms: u64,
    pub top: Vec<RankedRow>,
    #[serde(skip)]
    pub result: FinalResult,
}

/// A configured top-K job.
#[derive(Debug, Clone)]
pub struct TopKJob {
    k: usize,
    parallelism: usize,
    split_size: u64,
    merge_queue_capacity: usize,
    truncate: bool,
    parser: RecordParser,
    writer: ResultWriter,
}

impl TopKJob {
    /// Job with default settings and the given K.
    pub fn new(k: usize) -> Self {
        let mut job = Self::from_config(&TopTenConfig::default());
        job.k = k;
        job
    }

    pub fn from_config(config: &TopTenConfig) -> Self {
        Self {
            k: config.job.top_k,
            parallelism: config.job.parallelism.max(1),
            split_size: config.job.split_size_bytes.max(1),
            merge_queue_capacity: config.job.merge_queue_capacity.max(1),
            truncate: config.table.truncate,
            parser: RecordParser::new(RecordSchema::from(&config.schema)),
            writer: ResultWriter::from_config(&config.table, &config.schema),
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.parser = RecordParser::new(schema);
        self
    }

    pub fn with_writer(mut self, writer: ResultWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Reduce every partition in parallel and merge into the global top-K.
    #[instrument(skip_all, fields(k = self.k, partitions = partitions.len()))]
    pub fn aggregate<P: PartitionSource>(&self, partitions: Vec<P>) -> Result<Aggregation, JobError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .thread_name(|i| format!("topten-reduce-{i}"))
            .build()?;
        let (tx, rx) = bounded::<PartitionResult>(self.merge_queue_capacity);
        let k = self.k;
        let parser = &self.parser;

        std::thread::scope(|scope| {
            let merge = scope.spawn(move || {
                let mut merger = GlobalMerger::new(k);
                for partial in rx {
                    merger.absorb(partial);
                }
                let absorbed = merger.partitions_absorbed();
                (merger.finish(), absorbed)
            });

            let reduced: Result<Vec<PartitionStats>, JobError> = pool.install(|| {
                partitions
                    .into_par_iter()
                    .map_with(tx, |tx, partition| -> Result<PartitionStats, JobError> {
                        let label = partition.label();
                        let mut reducer = PartitionReducer::new(parser, k);
                        for raw in partition.open()? {
                            reducer.push(&raw?);
                        }
                        let (partial, stats) = reducer.finish();
                        debug!(
                            partition = %label,
                            seen = stats.records_seen,
                            skipped = stats.records_skipped(),
                            emitted = partial.len(),
                            "partition reduced"
                        );
                        tx.send(partial)
                            .map_err(|_| JobError::Merge("merge stage stopped receiving".into()))?;
                        Ok(stats)
                    })
                    .collect()
            });
            // every sender is gone once the pool returns, which ends the merge loop

            let (result, absorbed) = merge
                .join()
                .map_err(|_| JobError::Merge("merge thread panicked".into()))?;
            let per_partition = reduced?;

            let mut stats = PartitionStats::default();
            for partition_stats in &per_partition {
                stats += *partition_stats;
            }
            debug!(absorbed, final_len = result.len(), "merge complete");
            Ok(Aggregation {
                result,
                stats,
                partitions: per_partition.len(),
            })
        })
    }

    /// Aggregate and persist the final ranking.
    pub fn run<P: PartitionSource>(
        &self,
        partitions: Vec<P>,
        sink: &mut dyn ResultSink,
    ) -> Result<JobReport, JobError> {
        let started = Instant::now();
        let aggregation = self.aggregate(partitions)?;

        if self.truncate {
            sink.truncate(&self.writer.family)?;
        }
        let rows_written = self.writer.write(sink, &aggregation.result)?;

        let report = JobReport {
            partitions: aggregation.partitions,
            records: aggregation.stats,
            rows_written,
            elapsed_ms: started.elapsed().as_millis() as u64,
            top: aggregation
                .result
                .iter()
                .enumerate()
                .map(|(i, entry)| RankedRow {
                    rank: i + 1,
                    id: entry.payload.id.clone(),
                    score: entry.score,
                })
                .collect(),
            result: aggregation.result,
        };
        info!(
            partitions = report.partitions,
            seen = report.records.records_seen,
            skipped = report.records.records_skipped(),
            rows = report.rows_written,
            elapsed_ms = report.elapsed_ms,
            "top-k job finished"
        );
        Ok(report)
    }

    /// Plan splits for a file or directory and run over them.
    pub fn run_path(&self, input: &Path, sink: &mut dyn ResultSink) -> Result<JobReport, JobError> {
        let splits = plan_splits(input, self.split_size)?;
        info!(input = %input.display(), splits = splits.len(), k = self.k, "starting top-k job");
        self.run(splits, sink)
    }
}
