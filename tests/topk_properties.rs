use std::collections::BTreeMap;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use topten_rs::model::Fields;
use topten_rs::{BoundedTopK, GlobalMerger, Record, ScoredEntry};

/// Sort-everything reference: score descending, then payload ascending.
fn reference(scores: &[i64], k: usize) -> Vec<(i64, u32)> {
    let mut all: Vec<(i64, u32)> = scores.iter().enumerate().map(|(i, s)| (*s, i as u32)).collect();
    all.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    all.truncate(k);
    all
}

fn drain_pairs(top: &mut BoundedTopK<u32>) -> Vec<(i64, u32)> {
    top.drain().into_iter().map(|e| (e.score, e.payload)).collect()
}

fn record_entries(scores: &[i64]) -> Vec<ScoredEntry<Record>> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| ScoredEntry::new(*score, Record::new(format!("r{i:05}"), *score, Fields::new())))
        .collect()
}

fn local_top_by_identity(entries: Vec<ScoredEntry<Record>>, k: usize) -> Vec<ScoredEntry<Record>> {
    let mut top = BoundedTopK::new(k);
    for entry in entries {
        top.insert_unique_by(entry, Record::same_identity);
    }
    top.drain()
}

fn local_top(entries: Vec<ScoredEntry<Record>>, k: usize) -> Vec<ScoredEntry<Record>> {
    let mut top = BoundedTopK::new(k);
    top.extend(entries);
    top.drain()
}

proptest! {
    #[test]
    fn drain_matches_sort_and_take(
        scores in prop::collection::vec(-20i64..20, 0..200),
        k in 0usize..30
    ) {
        let mut top = BoundedTopK::new(k);
        for (i, score) in scores.iter().enumerate() {
            top.insert(*score, i as u32);
        }
        prop_assert!(top.len() <= k);
        prop_assert_eq!(drain_pairs(&mut top), reference(&scores, k));
        prop_assert!(top.is_empty());
    }

    #[test]
    fn insertion_order_does_not_matter(
        scores in prop::collection::vec(0i64..5, 0..150),
        k in 1usize..20,
        seed in any::<u64>()
    ) {
        let mut indexed: Vec<(i64, u32)> =
            scores.iter().enumerate().map(|(i, s)| (*s, i as u32)).collect();
        let mut forward = BoundedTopK::new(k);
        for (score, id) in &indexed {
            forward.insert(*score, *id);
        }
        indexed.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut shuffled = BoundedTopK::new(k);
        for (score, id) in &indexed {
            shuffled.insert(*score, *id);
        }
        prop_assert_eq!(drain_pairs(&mut forward), drain_pairs(&mut shuffled));
    }

    #[test]
    fn merging_partials_equals_whole(
        scores in prop::collection::vec(-50i64..50, 0..300),
        assignment in prop::collection::vec(0usize..8, 300),
        k in 0usize..25
    ) {
        let entries = record_entries(&scores);
        let mut parts: Vec<Vec<ScoredEntry<Record>>> = vec![Vec::new(); 8];
        for (i, entry) in entries.iter().cloned().enumerate() {
            parts[assignment[i]].push(entry);
        }
        let partials: Vec<_> = parts.into_iter().map(|p| local_top(p, k)).collect();
        for partial in &partials {
            prop_assert!(partial.len() <= k);
        }
        let merged = GlobalMerger::merge_all(k, partials);
        prop_assert_eq!(merged, local_top(entries, k));
    }

    #[test]
    fn repeated_identities_merge_to_best_per_identity(
        rows in prop::collection::vec((0u8..12, -10i64..10), 0..120),
        assignment in prop::collection::vec(0usize..4, 120),
        redeliver in 0usize..4,
        k in 1usize..8
    ) {
        let entries: Vec<ScoredEntry<Record>> = rows
            .iter()
            .map(|(id, score)| ScoredEntry::new(*score, Record::new(format!("u{id:02}"), *score, Fields::new())))
            .collect();
        let mut parts: Vec<Vec<ScoredEntry<Record>>> = vec![Vec::new(); 4];
        for (i, entry) in entries.iter().cloned().enumerate() {
            parts[assignment[i]].push(entry);
        }
        let mut partials: Vec<_> = parts.into_iter().map(|p| local_top_by_identity(p, k)).collect();
        partials.push(partials[redeliver].clone());
        let merged = GlobalMerger::merge_all(k, partials);

        let mut best: BTreeMap<String, ScoredEntry<Record>> = BTreeMap::new();
        for entry in entries {
            let id = entry.payload.id.clone();
            match best.get(&id) {
                Some(held) if *held >= entry => {}
                _ => {
                    best.insert(id, entry);
                }
            }
        }
        let mut expected: Vec<_> = best.into_values().collect();
        expected.sort_by(|a, b| b.cmp(a));
        expected.truncate(k);
        prop_assert_eq!(merged, expected);
    }

    #[test]
    fn equal_scores_resolve_by_identity(n in 1usize..60, k in 1usize..20) {
        let scores = vec![7i64; n];
        let entries = record_entries(&scores);
        let top = local_top(entries, k);
        let ids: Vec<String> = top.iter().map(|e| e.payload.id.clone()).collect();
        let expected: Vec<String> = (0..n.min(k)).map(|i| format!("r{i:05}")).collect();
        prop_assert_eq!(ids, expected);
    }
}

#[test]
fn fewer_than_k_returns_everything_best_first() {
    let mut top = BoundedTopK::new(10);
    top.insert(1, 0u32);
    top.insert(3, 1);
    top.insert(2, 2);
    assert_eq!(drain_pairs(&mut top), vec![(3, 1), (2, 2), (1, 0)]);
}

#[test]
fn zero_capacity_retains_nothing() {
    let mut top = BoundedTopK::new(0);
    assert!(!top.insert(100, 1u32));
    assert!(top.drain().is_empty());
}
