use std::path::PathBuf;

use psmatch::SubjectRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Records from `(id, group, scores)` triples
#[must_use]
pub fn records(rows: &[(&str, &str, &[f64])]) -> Vec<SubjectRecord> {
    rows.iter()
        .map(|(id, group, scores)| SubjectRecord::new(*id, *group, scores.to_vec()))
        .collect()
}

/// The four-pair nearest-neighbor fixture
#[must_use]
pub fn four_pairs() -> Vec<SubjectRecord> {
    records(&[
        ("t1", "1", &[0.10]),
        ("t2", "1", &[0.50]),
        ("t3", "1", &[0.52]),
        ("t4", "1", &[0.90]),
        ("r1", "0", &[0.11]),
        ("r2", "0", &[0.49]),
        ("r3", "0", &[0.53]),
        ("r4", "0", &[0.89]),
    ])
}

/// Two groups whose scores are drawn from shifted ranges
///
/// Treatment units (`"1"`) sit in `[0.4, 0.8)`, referents (`"0"`) in
/// `[0.0, 0.8)`, with four referents per treatment unit.
#[must_use]
pub fn shifted_population(treated: usize, seed: u64) -> Vec<SubjectRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(treated * 5);
    for i in 0..treated {
        out.push(SubjectRecord::new(
            format!("t{i}"),
            "1",
            vec![0.4 + 0.4 * rng.random::<f64>()],
        ));
    }
    for i in 0..treated * 4 {
        out.push(SubjectRecord::new(
            format!("r{i}"),
            "0",
            vec![0.8 * rng.random::<f64>()],
        ));
    }
    out
}

/// Random subjects spread round-robin over `groups` groups named `g0..`
#[must_use]
pub fn random_groups(n: usize, groups: usize, seed: u64) -> Vec<SubjectRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let scores = (0..groups - 1).map(|_| rng.random::<f64>()).collect();
            SubjectRecord::new(format!("s{i}"), format!("g{}", i % groups), scores)
        })
        .collect()
}

/// Unique path in the system temp directory
#[must_use]
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("psmatch_{}_{name}", std::process::id()))
}
