//! End-to-end tests for the matcher: validation, output rows and determinism

use psmatch::{Algorithm, MatchError, Matcher, MatchingConfig};
use rustc_hash::FxHashSet;

use crate::utils::{four_pairs, random_groups, records, shifted_population};

fn two_group(algorithm: Algorithm) -> MatchingConfig {
    MatchingConfig::builder()
        .algorithm(algorithm)
        .num_groups(2)
        .treatment_group("1")
        .build()
}

#[test]
fn test_nearest_neighbor_scenario() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NearestNeighbor)
        .caliper(0.05)
        .build();
    let result = Matcher::new(config).perform_matching(four_pairs()).unwrap();

    assert_eq!(result.set_count(), 4);
    assert_eq!(result.matched_count(), 8);

    let pairs: Vec<(&str, &str)> = result
        .records
        .chunks(2)
        .map(|pair| (pair[0].patient_id.as_str(), pair[1].patient_id.as_str()))
        .collect();
    assert_eq!(pairs, vec![("t1", "r1"), ("t2", "r2"), ("t3", "r3"), ("t4", "r4")]);

    for (i, row) in result.records.iter().enumerate() {
        assert_eq!(row.set_number, i / 2 + 1);
        assert!(row.distance <= 0.0100001);
        assert!(row.info.is_some());
    }
    assert_eq!(
        result.matched_per_group,
        vec![("1".to_string(), 4), ("0".to_string(), 4)]
    );
}

#[test]
fn test_no_candidate_in_two_sets() {
    for algorithm in Algorithm::ALL {
        let (groups, data) = match algorithm {
            a if a.is_two_group() => (2, shifted_population(40, 9)),
            Algorithm::Complete | Algorithm::NWay | Algorithm::ThreeWay => {
                (3, random_groups(120, 3, 10))
            }
            _ => unreachable!(),
        };
        let treatment = if groups == 2 { "1" } else { "g0" };
        let config = MatchingConfig::builder()
            .algorithm(algorithm)
            .num_groups(groups)
            .treatment_group(treatment)
            .match_ratio(2)
            .build();
        let result = Matcher::new(config).perform_matching(data).unwrap();

        let mut seen = FxHashSet::default();
        for row in &result.records {
            assert!(
                seen.insert(row.patient_id.clone()),
                "{algorithm}: {} appears twice",
                row.patient_id
            );
        }
    }
}

#[test]
fn test_caliper_bounds_every_pair() {
    for algorithm in [
        Algorithm::NearestNeighbor,
        Algorithm::BalancedNearestNeighbor,
        Algorithm::CaliperGreedy,
    ] {
        let config = MatchingConfig::builder()
            .algorithm(algorithm)
            .caliper(0.02)
            .build();
        let result = Matcher::new(config)
            .perform_matching(shifted_population(50, 21))
            .unwrap();
        assert!(!result.is_empty());
        for set in &result.sets {
            assert!(set.distance <= 0.02, "{algorithm}: {}", set.distance);
        }
    }
}

#[test]
fn test_fixed_ratio_keeps_full_sets_only() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NearestNeighbor)
        .match_ratio(2)
        .fixed_ratio(true)
        .caliper(0.05)
        .build();
    let data = records(&[
        ("t1", "1", &[0.20]),
        ("t2", "1", &[0.70]),
        ("r1", "0", &[0.21]),
        ("r2", "0", &[0.19]),
        ("r3", "0", &[0.71]),
    ]);
    let result = Matcher::new(config).perform_matching(data).unwrap();

    assert_eq!(result.set_count(), 1);
    assert_eq!(result.sets[0].len(), 3);
    let ids: Vec<&str> = result.records.iter().map(|r| r.patient_id.as_str()).collect();
    assert_eq!(ids[0], "t1");
    assert!(ids.contains(&"r1") && ids.contains(&"r2"));
}

#[test]
fn test_variable_ratio_set_sizes() {
    for sequential in [false, true] {
        let config = MatchingConfig::builder()
            .algorithm(Algorithm::NearestNeighbor)
            .match_ratio(3)
            .use_parallel(!sequential)
            .build();
        let result = Matcher::new(config)
            .perform_matching(shifted_population(30, 4))
            .unwrap();
        assert!(!result.is_empty());
        for set in &result.sets {
            assert!((2..=4).contains(&set.len()), "size {}", set.len());
        }
    }
}

#[test]
fn test_digit_greedy_is_deterministic() {
    let run = || {
        Matcher::new(
            MatchingConfig::builder()
                .algorithm(Algorithm::DigitGreedy)
                .random_seed(99)
                .build(),
        )
        .perform_matching(shifted_population(60, 5))
        .unwrap()
        .records
    };
    assert_eq!(run(), run());
}

#[test]
fn test_isolated_unit_produces_no_row() {
    let data = records(&[
        ("t1", "1", &[0.10]),
        ("t2", "1", &[0.95]),
        ("r1", "0", &[0.11]),
        ("r2", "0", &[0.50]),
    ]);
    let result = Matcher::new(two_group(Algorithm::CaliperGreedy))
        .perform_matching(data)
        .unwrap();

    assert_eq!(result.set_count(), 1);
    assert!(result.records.iter().all(|r| r.patient_id != "t2"));
}

#[test]
fn test_duplicate_id_is_rejected() {
    let data = records(&[("a", "1", &[0.1]), ("a", "0", &[0.2])]);
    let err = Matcher::new(two_group(Algorithm::NearestNeighbor))
        .perform_matching(data)
        .unwrap_err();
    assert!(matches!(err, MatchError::DuplicateId(ref id) if id == "a"));
}

#[test]
fn test_missing_treatment_group_is_rejected() {
    let data = records(&[("a", "0", &[0.1]), ("b", "0", &[0.2])]);
    let err = Matcher::new(two_group(Algorithm::NearestNeighbor))
        .perform_matching(data)
        .unwrap_err();
    assert!(matches!(err, MatchError::EmptyGroup(_)));
}

#[test]
fn test_bad_configuration_is_rejected() {
    let invalid = [
        MatchingConfig::builder().caliper(0.0).build(),
        MatchingConfig::builder().match_ratio(0).build(),
        MatchingConfig::builder()
            .algorithm(Algorithm::DigitGreedy)
            .digits(1, 3)
            .build(),
        MatchingConfig::builder()
            .algorithm(Algorithm::NWay)
            .num_groups(2)
            .build(),
    ];
    for config in invalid {
        assert!(Matcher::new(config).perform_matching(four_pairs()).is_err());
    }
}

#[test]
fn test_json_configuration_with_defaults() {
    let config = MatchingConfig::from_json_str(
        r#"{ "algorithm": "caliper-greedy", "match_ratio": 2, "random_seed": 3 }"#,
    )
    .unwrap();
    assert_eq!(config.algorithm, Algorithm::CaliperGreedy);
    assert_eq!(config.match_ratio, 2);
    assert_eq!(config.num_groups, 2);
    assert!((config.effective_caliper() - 0.05).abs() < 1e-12);

    let result = Matcher::new(config)
        .perform_matching(shifted_population(20, 8))
        .unwrap();
    assert!(!result.is_empty());
}
