//! Two-group strategies observed through matcher output

use psmatch::{Algorithm, Matcher, MatchingConfig, MatchingResult};

use crate::utils::shifted_population;

fn run(config: MatchingConfig, treated: usize, seed: u64) -> MatchingResult {
    Matcher::new(config)
        .perform_matching(shifted_population(treated, seed))
        .unwrap()
}

#[test]
fn test_balanced_sets_keep_sides_even() {
    for parallel in [true, false] {
        let config = MatchingConfig::builder()
            .algorithm(Algorithm::BalancedNearestNeighbor)
            .match_ratio(4)
            .use_parallel(parallel)
            .caliper(0.1)
            .build();
        let result = run(config, 40, 12);
        assert!(!result.is_empty());

        for set in result.records.chunk_by(|a, b| a.set_number == b.set_number) {
            let treatment = set[0].scores[0];
            let left = set[1..].iter().filter(|r| r.scores[0] < treatment).count();
            let right = set.len() - 1 - left;
            if set.len() >= 3 {
                assert!(left.abs_diff(right) <= 1, "left {left}, right {right}");
            }
        }
    }
}

#[test]
fn test_sequential_passes_are_recorded() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NearestNeighbor)
        .match_ratio(2)
        .use_parallel(false)
        .build();
    let result = run(config, 30, 14);

    let full = result
        .sets
        .iter()
        .find(|s| s.len() == 3)
        .expect("some treatment unit gets two referents");
    let info = full.info.as_deref().unwrap_or_default();
    assert!(info.contains("pass 1 of 2"));
    assert!(info.contains("pass 2 of 2"));
}

#[test]
fn test_digit_greedy_records_precision() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::DigitGreedy)
        .digits(4, 2)
        .build();
    let result = run(config, 40, 15);
    assert!(!result.is_empty());

    for set in &result.sets {
        let info = set.info.as_deref().unwrap_or_default();
        assert!(info.starts_with("digit-greedy, "), "{info}");
        assert!(["4 digit(s)", "3 digit(s)", "2 digit(s)"]
            .iter()
            .any(|d| info.contains(d)));
    }
}

#[test]
fn test_caliper_greedy_ratio_gives_more_referents() {
    let single = run(
        MatchingConfig::builder()
            .algorithm(Algorithm::CaliperGreedy)
            .build(),
        30,
        16,
    );
    let double = run(
        MatchingConfig::builder()
            .algorithm(Algorithm::CaliperGreedy)
            .match_ratio(2)
            .build(),
        30,
        16,
    );
    assert!(double.matched_count() > single.matched_count());
    assert!(double.sets.iter().all(|s| s.len() <= 3));
}
