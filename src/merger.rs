//! # Global Merger
//!
//! Single consumer of every partition's local top-K. Merging in more than one
//! place would yield the top-K of a subset, so the merger is neither `Clone`
//! nor shareable: all partial results must flow into one instance.
//!
//! Partitions may be delivered more than once and one entity may appear in
//! several of them. The merger keeps only the best entry per identity, so every
//! rank of the final result belongs to a distinct entity.

use crate::model::{FinalResult, PartitionResult, Record};
use crate::topk::BoundedTopK;
use tracing::trace;

pub struct GlobalMerger {
    top: BoundedTopK<Record>,
    partitions_absorbed: usize,
    entries_absorbed: u64,
}

impl GlobalMerger {
    pub fn new(k: usize) -> Self {
        Self {
            top: BoundedTopK::new(k),
            partitions_absorbed: 0,
            entries_absorbed: 0,
        }
    }

    /// Fold one partition's local result in. Arrival order does not matter.
    pub fn absorb(&mut self, partial: PartitionResult) {
        self.partitions_absorbed += 1;
        self.entries_absorbed += partial.len() as u64;
        trace!(entries = partial.len(), "absorbing partition result");
        for entry in partial {
            self.top.insert_unique_by(entry, Record::same_identity);
        }
    }

    pub fn partitions_absorbed(&self) -> usize {
        self.partitions_absorbed
    }

    pub fn entries_absorbed(&self) -> u64 {
        self.entries_absorbed
    }

    /// The global top-K, best first.
    pub fn finish(mut self) -> FinalResult {
        self.top.drain()
    }

    /// Merge a complete set of partial results.
    pub fn merge_all<I>(k: usize, partials: I) -> FinalResult
    where
        I: IntoIterator<Item = PartitionResult>,
    {
        let mut merger = Self::new(k);
        for partial in partials {
            merger.absorb(partial);
        }
        merger.finish()
    }
}
