//! Balance assessment on a shifted population

use psmatch::algorithm::matching::{BalanceCalculator, CandidatePool};
use psmatch::{Algorithm, Matcher, MatchingConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::utils::{random_groups, shifted_population, temp_path};

#[test]
fn test_standardized_difference_shrinks_after_matching() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NearestNeighbor)
        .caliper(0.02)
        .build();
    let result = Matcher::new(config)
        .perform_matching(shifted_population(200, 31))
        .unwrap();

    let report = &result.balance;
    assert_eq!(report.metrics.len(), 1);
    let metric = &report.metrics[0];
    assert_eq!(metric.name, "ps_1: 1 vs 0");
    assert!(metric.standardized_difference_before.abs() > 0.5);
    assert!(metric.standardized_difference.abs() < 0.1);
    assert!(metric.standardized_difference.abs() < metric.standardized_difference_before.abs());
    assert_eq!(report.summary.total_covariates, 1);
    assert_eq!(report.summary.imbalanced_covariates, 0);
}

#[test]
fn test_one_metric_per_axis_and_comparison_group() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::NWay)
        .num_groups(3)
        .build();
    let result = Matcher::new(config)
        .perform_matching(random_groups(150, 3, 32))
        .unwrap();

    // two score axes against two comparison groups
    assert_eq!(result.balance.metrics.len(), 4);
    let text = result.balance.to_string();
    assert!(text.contains("Balance Summary"));
    assert!(text.contains("ps_2: g0 vs g2"));
}

#[test]
fn test_too_few_observations_are_skipped() {
    let labels = vec!["1".to_string(), "0".to_string()];
    let mut rng = StdRng::seed_from_u64(33);
    let pool = CandidatePool::new(shifted_population(20, 33), &labels, &mut rng).unwrap();

    // nothing matched, so no after-matching comparison is possible
    let report = BalanceCalculator::new()
        .with_min_observations(2)
        .with_imbalance_threshold(0.05)
        .calculate_balance(&pool, &[]);
    assert!(report.metrics.is_empty());
    assert_eq!(report.summary.total_covariates, 0);
}

#[test]
fn test_balance_report_csv() {
    let config = MatchingConfig::builder()
        .algorithm(Algorithm::CaliperGreedy)
        .build();
    let result = Matcher::new(config)
        .perform_matching(shifted_population(50, 34))
        .unwrap();

    let path = temp_path("balance.csv");
    result.balance.write_to_csv(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("Score,Reference Mean"));
    assert!(lines.next().unwrap().starts_with("ps_1: 1 vs 0,"));
}
