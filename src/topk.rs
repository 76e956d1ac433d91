//! # Bounded Top-K
//!
//! Fixed-capacity selection of the K best scored entries.
//!
//! The container is a min-heap of at most K entries whose root is the worst
//! entry held. Once full, a new entry is admitted only if it ranks strictly
//! above that root, which it then evicts. Memory stays O(K) no matter how many
//! entries stream through.
//!
//! Ranking follows [`ScoredEntry`]'s `Ord`: higher score first, then the
//! smaller payload. Consequences at the eviction boundary:
//!
//! - an entry whose score equals the current minimum is not admitted on score
//!   alone; it gets in only if its payload sorts before the minimum's payload;
//! - an exact duplicate of the minimum is never admitted.
//!
//! Because the rank is a total order on distinct entries, the drained set
//! depends only on the multiset of inserted entries, never on their order.
//!
//! [`BoundedTopK::insert_unique_by`] additionally holds at most one entry per
//! key, keeping the best one.

use crate::model::ScoredEntry;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Keeps the `capacity` best entries inserted so far.
#[derive(Debug, Clone)]
pub struct BoundedTopK<T: Ord> {
    capacity: usize,
    heap: BinaryHeap<Reverse<ScoredEntry<T>>>,
}

impl<T: Ord> BoundedTopK<T> {
    /// Create an empty container holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            // +1 leaves room for the push-before-pop in `insert`
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1 << 16)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Score an entry must reach to be considered once the container is full.
    pub fn min_score(&self) -> Option<i64> {
        self.heap.peek().map(|Reverse(entry)| entry.score)
    }

    /// Offer an entry. Returns `true` if it is now held.
    ///
    /// O(log K).
    pub fn insert(&mut self, score: i64, payload: T) -> bool {
        self.insert_entry(ScoredEntry::new(score, payload))
    }

    pub fn insert_entry(&mut self, entry: ScoredEntry<T>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(entry));
            return true;
        }
        let admit = self
            .heap
            .peek()
            .is_some_and(|Reverse(worst)| entry > *worst);
        if admit {
            self.heap.pop();
            self.heap.push(Reverse(entry));
        }
        admit
    }

    /// Offer an entry while holding at most one entry per key, where
    /// `same_key` decides whether two payloads share a key. A held entry with
    /// the same key is replaced only if the new entry ranks above it.
    ///
    /// The held set is the top K of the best entry per key, whatever the
    /// insertion order. O(K) when the entry clears the admission threshold.
    pub fn insert_unique_by<F>(&mut self, entry: ScoredEntry<T>, same_key: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        if self.capacity == 0 {
            return false;
        }
        // anything at or below a full container's minimum can't displace a
        // held entry of its own key either
        if self.is_full()
            && self
                .heap
                .peek()
                .is_some_and(|Reverse(worst)| entry <= *worst)
        {
            return false;
        }

        let beats_held = self
            .heap
            .iter()
            .find(|Reverse(held)| same_key(&held.payload, &entry.payload))
            .map(|Reverse(held)| entry > *held);
        match beats_held {
            None => self.insert_entry(entry),
            Some(false) => false,
            Some(true) => {
                let mut entries = std::mem::take(&mut self.heap).into_vec();
                entries.retain(|Reverse(held)| !same_key(&held.payload, &entry.payload));
                entries.push(Reverse(entry));
                self.heap = BinaryHeap::from(entries);
                true
            }
        }
    }

    /// Held entries, best first. Leaves the container empty.
    pub fn drain(&mut self) -> Vec<ScoredEntry<T>> {
        let heap = std::mem::take(&mut self.heap);
        // ascending over Reverse == descending over the entries
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse(entry)| entry)
            .collect()
    }

    /// Consume the container and return its entries, best first.
    pub fn into_sorted_vec(mut self) -> Vec<ScoredEntry<T>> {
        self.drain()
    }

    /// Held entries in heap order. For diagnostics only.
    pub fn iter_unordered(&self) -> impl Iterator<Item = &ScoredEntry<T>> {
        self.heap.iter().map(|Reverse(entry)| entry)
    }
}

impl<T: Ord> Extend<ScoredEntry<T>> for BoundedTopK<T> {
    fn extend<I: IntoIterator<Item = ScoredEntry<T>>>(&mut self, iter: I) {
        for entry in iter {
            self.insert_entry(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores<T>(entries: &[ScoredEntry<T>]) -> Vec<i64> {
        entries.iter().map(|e| e.score).collect()
    }

    #[test]
    fn keeps_the_k_highest_in_descending_order() {
        let mut top = BoundedTopK::new(3);
        for (i, score) in [4, 17, 2, 9, 11, 1, 17].into_iter().enumerate() {
            top.insert(score, i);
        }
        assert_eq!(top.len(), 3);
        let drained = top.drain();
        assert_eq!(scores(&drained), vec![17, 17, 11]);
        // smaller payload first among equal scores
        assert_eq!(drained[0].payload, 1);
        assert_eq!(drained[1].payload, 6);
        assert!(top.is_empty());
    }

    #[test]
    fn fewer_than_k_returns_everything() {
        let mut top = BoundedTopK::new(10);
        top.insert(5, "a");
        top.insert(1, "b");
        let drained = top.drain();
        assert_eq!(scores(&drained), vec![5, 1]);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut top = BoundedTopK::new(0);
        assert!(!top.insert(100, ()));
        assert!(top.drain().is_empty());
    }

    #[test]
    fn equal_to_minimum_with_later_payload_is_rejected() {
        let mut top = BoundedTopK::new(2);
        assert!(top.insert(5, "a"));
        assert!(top.insert(3, "b"));
        assert!(!top.insert(3, "c"));
        assert_eq!(top.min_score(), Some(3));
        let drained = top.drain();
        assert_eq!(drained[1].payload, "b");
    }

    #[test]
    fn equal_to_minimum_with_earlier_payload_evicts() {
        let mut top = BoundedTopK::new(2);
        top.insert(5, "a");
        top.insert(3, "c");
        assert!(top.insert(3, "b"));
        let drained = top.drain();
        assert_eq!(drained[1].payload, "b");
    }

    #[test]
    fn exact_duplicate_of_minimum_is_rejected_when_full() {
        let mut top = BoundedTopK::new(1);
        assert!(top.insert(7, "x"));
        assert!(!top.insert(7, "x"));
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn duplicates_below_capacity_are_kept() {
        let mut top = BoundedTopK::new(4);
        top.insert(7, "x");
        top.insert(7, "x");
        assert_eq!(top.len(), 2);
    }

    fn same_name(a: &(&str, u8), b: &(&str, u8)) -> bool {
        a.0 == b.0
    }

    #[test]
    fn keyed_insert_keeps_best_entry_per_key() {
        let mut top = BoundedTopK::new(3);
        assert!(top.insert_unique_by(ScoredEntry::new(5, ("a", 0)), same_name));
        assert!(top.insert_unique_by(ScoredEntry::new(4, ("b", 0)), same_name));
        // a worse copy of a held key is rejected even with room left
        assert!(!top.insert_unique_by(ScoredEntry::new(1, ("a", 1)), same_name));
        assert!(!top.insert_unique_by(ScoredEntry::new(5, ("a", 0)), same_name));
        // a better copy replaces the held one in place
        assert!(top.insert_unique_by(ScoredEntry::new(9, ("b", 1)), same_name));
        assert_eq!(top.len(), 2);

        let drained = top.drain();
        assert_eq!(scores(&drained), vec![9, 5]);
        assert_eq!(drained[0].payload, ("b", 1));
    }

    #[test]
    fn keyed_insert_is_order_independent() {
        let entries = [
            ScoredEntry::new(3, ("x", 0)),
            ScoredEntry::new(8, ("y", 0)),
            ScoredEntry::new(7, ("x", 1)),
            ScoredEntry::new(2, ("z", 0)),
            ScoredEntry::new(6, ("z", 1)),
        ];
        let mut forward = BoundedTopK::new(2);
        for entry in entries.iter().cloned() {
            forward.insert_unique_by(entry, same_name);
        }
        let mut backward = BoundedTopK::new(2);
        for entry in entries.iter().rev().cloned() {
            backward.insert_unique_by(entry, same_name);
        }
        let drained = forward.drain();
        assert_eq!(drained, backward.drain());
        assert_eq!(scores(&drained), vec![8, 7]);
        assert_eq!(drained[1].payload, ("x", 1));
    }

    #[test]
    fn drain_resets_for_reuse() {
        let mut top = BoundedTopK::new(2);
        top.extend([ScoredEntry::new(1, 'a'), ScoredEntry::new(2, 'b')]);
        assert_eq!(top.drain().len(), 2);
        top.insert(0, 'c');
        assert_eq!(scores(&top.drain()), vec![0]);
    }

    #[test]
    fn negative_scores_are_ranked() {
        let mut top = BoundedTopK::new(2);
        for score in [-5, -1, -10, -3] {
            top.insert(score, score);
        }
        assert_eq!(scores(&top.into_sorted_vec()), vec![-1, -3]);
    }
}
