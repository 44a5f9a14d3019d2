//! Block, N-way and three-way matching through the matcher

use psmatch::{Algorithm, Matcher, MatchingConfig, SubjectRecord};
use rustc_hash::FxHashSet;

use crate::utils::{random_groups, records};

#[test]
fn test_block_scenario_shares_a_bin() {
    let data = records(&[
        ("a", "A", &[0.23]),
        ("b", "B", &[0.27]),
        ("c", "B", &[0.55]),
    ]);
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::Complete)
        .caliper(0.1)
        .build();
    let result = Matcher::new(config).perform_matching(data).unwrap();

    assert_eq!(result.set_count(), 1);
    let ids: Vec<&str> = result.records.iter().map(|r| r.patient_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(result.records.iter().all(|r| r.info.is_none()));
}

#[test]
fn test_n_way_output_independent_of_workers() {
    let run = |workers: usize| {
        let config = MatchingConfig::builder()
            .algorithm(Algorithm::NWay)
            .num_groups(4)
            .workers(workers)
            .random_seed(17)
            .build();
        Matcher::new(config)
            .perform_matching(random_groups(200, 4, 18))
            .unwrap()
            .records
    };

    let single = run(1);
    assert!(!single.is_empty());
    assert_eq!(single, run(4));
}

#[test]
fn test_n_way_sets_hold_one_member_per_group() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NWay)
        .num_groups(3)
        .build();
    let result = Matcher::new(config)
        .perform_matching(random_groups(90, 3, 19))
        .unwrap();

    assert!(result.set_count() > 0);
    assert!(result.set_count() <= 30);
    for set in result.records.chunks(3) {
        let groups: Vec<&str> = set.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["g0", "g1", "g2"]);
        assert!(set.iter().all(|r| r.set_number == set[0].set_number));
    }
}

#[test]
fn test_n_way_prefers_farther_member_toward_third_group() {
    let mut data = records(&[
        ("a", "A", &[0.5, 0.5]),
        ("b_best", "B", &[0.52, 0.5]),
        ("c", "C", &[0.6, 0.5]),
    ]);
    // a crowd of B units just below the base, away from C
    data.extend((0..10).map(|i| {
        SubjectRecord::new(format!("b{i}"), "B", vec![0.49 - f64::from(i) * 1e-4, 0.5])
    }));

    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NWay)
        .num_groups(3)
        .build();
    let result = Matcher::new(config).perform_matching(data).unwrap();

    let ids: Vec<&str> = result.records.iter().map(|r| r.patient_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b_best", "c"]);
    assert!((result.sets[0].distance - 0.0056).abs() < 1e-9);
}

#[test]
fn test_three_way_triangles_are_disjoint() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::ThreeWay)
        .num_groups(3)
        .caliper(0.8)
        .build();
    let result = Matcher::new(config)
        .perform_matching(random_groups(150, 3, 20))
        .unwrap();
    assert!(!result.is_empty());

    let mut seen = FxHashSet::default();
    for set in &result.sets {
        assert_eq!(set.len(), 3);
        assert!(set.distance <= 0.8);
    }
    for row in &result.records {
        assert!(seen.insert(row.patient_id.clone()));
    }
}
