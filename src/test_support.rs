use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Raw record lines plus the `(id, score)` of every line that should be kept.
#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    pub lines: Vec<String>,
    #[allow(dead_code)]
    pub valid: Vec<(String, i64)>,
}

/// Record line in the default schema (`Id`, `Reputation`).
pub fn user_row(id: &str, reputation: i64) -> String {
    format!(r#"<row Id="{id}" Reputation="{reputation}" DisplayName="user_{id}" />"#)
}

/// Generate `count` lines with unique ids. Roughly `malformed_probability`
/// of them are broken in one of several ways and must be skipped.
pub fn generate_dataset(count: u32, malformed_probability: f64, seed: u64) -> GeneratedDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut lines = Vec::with_capacity(count as usize);
    let mut valid = Vec::new();

    for i in 1..=count {
        let id = format!("{i}");
        // narrow range so equal scores are common
        let reputation = rng.random_range(1..=5_000i64);

        if rng.random_bool(malformed_probability) {
            let broken = match rng.random_range(0..5) {
                0 => format!(r#"<row Id="{id}" DisplayName="no_score" />"#),
                1 => format!(r#"<row Id="{id}" Reputation="n/a" />"#),
                2 => format!(r#"<row Id="{id}" Reputation="{reputation}"#),
                3 => user_row("-1", reputation),
                _ => "<r".to_string(),
            };
            lines.push(broken);
            continue;
        }

        lines.push(user_row(&id, reputation));
        valid.push((id, reputation));
    }

    GeneratedDataset { lines, valid }
}

/// Scatter lines over `parts` partitions at random.
#[allow(dead_code)]
pub fn partition_randomly(lines: &[String], parts: usize, seed: u64) -> Vec<Vec<String>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut partitions = vec![Vec::new(); parts.max(1)];
    let mut shuffled = lines.to_vec();
    shuffled.shuffle(&mut rng);
    for line in shuffled {
        let slot = rng.random_range(0..partitions.len());
        partitions[slot].push(line);
    }
    partitions
}

/// Reference answer: sort everything, keep the first `k`. Equal scores rank
/// by ascending id.
#[allow(dead_code)]
pub fn expected_top_k(valid: &[(String, i64)], k: usize) -> Vec<(String, i64)> {
    let mut sorted = valid.to_vec();
    sorted.sort_by(|(a_id, a), (b_id, b)| b.cmp(a).then_with(|| a_id.cmp(b_id)));
    sorted.truncate(k);
    sorted
}
