//! Balance assessment for matched cohorts
//!
//! For every score dimension and every comparison group, the standardized
//! difference against the reference group (pool group 0: the treatment group
//! in two-group runs) is computed over all subjects and again over matched
//! subjects only.

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use rustc_hash::FxHashSet;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::match_set::MatchSet;
use crate::error::util::safe_create_file;
use crate::error::{MatchError, Result};

/// Balance of one score dimension between the reference and one other group
#[derive(Debug, Clone)]
pub struct BalanceMetric {
    /// Score column and compared groups, e.g. `ps_1: 1 vs 0`
    pub name: String,

    /// Standardized difference over all subjects
    pub standardized_difference_before: f64,

    /// Standardized difference over matched subjects
    pub standardized_difference: f64,

    /// Mean score of matched reference subjects
    pub reference_mean: f64,

    /// Mean score of matched comparison subjects
    pub comparison_mean: f64,

    /// Standard deviation of matched reference subjects
    pub reference_std: f64,

    /// Standard deviation of matched comparison subjects
    pub comparison_std: f64,
}

/// Summary statistics for a balance report
#[derive(Debug, Clone)]
pub struct BalanceSummary {
    /// Number of metrics with standardized difference above the threshold
    pub imbalanced_covariates: usize,

    /// Maximum absolute standardized difference after matching
    pub max_standardized_difference: f64,

    /// Maximum absolute standardized difference before matching
    pub max_standardized_difference_before: f64,

    /// Mean absolute standardized difference after matching
    pub mean_absolute_standardized_difference: f64,

    /// Total number of metrics
    pub total_covariates: usize,
}

/// Report on score balance before and after matching
#[derive(Debug, Clone)]
pub struct BalanceReport {
    /// Balance metrics for each score dimension and comparison group
    pub metrics: Vec<BalanceMetric>,

    /// Summary statistics
    pub summary: BalanceSummary,
}

impl BalanceReport {
    fn sorted_metrics(&self) -> Vec<&BalanceMetric> {
        let mut sorted: Vec<&BalanceMetric> = self.metrics.iter().collect();
        sorted.sort_by(|a, b| {
            b.standardized_difference
                .abs()
                .total_cmp(&a.standardized_difference.abs())
        });
        sorted
    }

    /// Write the report to a CSV file
    pub fn write_to_csv(&self, path: &Path) -> Result<()> {
        let file = safe_create_file(path, "balance report")?;
        let mut out = BufWriter::new(file);
        let fail = |e| MatchError::io(path, "Failed to write balance report", e);

        writeln!(
            out,
            "Score,Reference Mean,Comparison Mean,Reference SD,Comparison SD,Std Diff Before,Std Diff After"
        )
        .map_err(fail)?;
        for metric in self.sorted_metrics() {
            writeln!(
                out,
                "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                escape_csv(&metric.name),
                metric.reference_mean,
                metric.comparison_mean,
                metric.reference_std,
                metric.comparison_std,
                metric.standardized_difference_before,
                metric.standardized_difference
            )
            .map_err(fail)?;
        }
        out.flush().map_err(fail)?;
        Ok(())
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Balance Summary:\n\
             - Total comparisons: {}\n\
             - Imbalanced after matching: {}\n\
             - Maximum standardized difference: {:.4} (before: {:.4})\n\
             - Mean absolute standardized difference: {:.4}\n",
            self.summary.total_covariates,
            self.summary.imbalanced_covariates,
            self.summary.max_standardized_difference,
            self.summary.max_standardized_difference_before,
            self.summary.mean_absolute_standardized_difference
        )?;
        writeln!(
            f,
            "Score                          | Ref Mean  | Cmp Mean  | Ref SD   | Cmp SD   | Before   | After\n\
             -------------------------------|-----------|-----------|----------|----------|----------|---------"
        )?;
        for metric in self.sorted_metrics() {
            writeln!(
                f,
                "{:<30} | {:>9.4} | {:>9.4} | {:>8.4} | {:>8.4} | {:>8.4} | {:>8.4}",
                truncate_string(&metric.name, 30),
                metric.reference_mean,
                metric.comparison_mean,
                metric.reference_std,
                metric.comparison_std,
                metric.standardized_difference_before,
                metric.standardized_difference
            )?;
        }
        Ok(())
    }
}

/// Calculator for balance metrics
#[derive(Debug, Clone)]
pub struct BalanceCalculator {
    /// Minimum observations per group for a metric to be reported
    min_observations: usize,

    /// Threshold for marking a metric as imbalanced
    imbalance_threshold: f64,
}

impl Default for BalanceCalculator {
    fn default() -> Self {
        Self {
            min_observations: 2,
            imbalance_threshold: 0.1,
        }
    }
}

impl BalanceCalculator {
    /// Create a new balance calculator with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set minimum required observations per group
    #[must_use]
    pub const fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    /// Set threshold for marking a metric as imbalanced
    #[must_use]
    pub const fn with_imbalance_threshold(mut self, threshold: f64) -> Self {
        self.imbalance_threshold = threshold;
        self
    }

    /// Calculate balance over the whole pool and over the committed sets
    #[must_use]
    pub fn calculate_balance(&self, pool: &CandidatePool, sets: &[MatchSet]) -> BalanceReport {
        let matched: FxHashSet<usize> = sets
            .iter()
            .flat_map(|s| s.members.iter().copied())
            .collect();
        let dims = pool.candidates().first().map_or(0, |c| c.scores.len());
        let reference = pool.group(0);

        let mut metrics = Vec::new();
        for axis in 0..dims {
            for comparison in pool.groups().iter().skip(1) {
                let name = format!("ps_{}: {} vs {}", axis + 1, reference.name(), comparison.name());
                let values = |members: &[usize], only_matched: bool| -> Vec<f64> {
                    members
                        .iter()
                        .filter(|&&m| !only_matched || matched.contains(&m))
                        .map(|&m| pool.get(m).scores[axis])
                        .collect()
                };

                let ref_all = values(reference.members(), false);
                let cmp_all = values(comparison.members(), false);
                let ref_matched = values(reference.members(), true);
                let cmp_matched = values(comparison.members(), true);

                if [&ref_all, &cmp_all, &ref_matched, &cmp_matched]
                    .iter()
                    .any(|v| v.len() < self.min_observations)
                {
                    warn!("Too few observations for balance of {name}, skipping");
                    continue;
                }

                let before = Contrast::of(&ref_all, &cmp_all);
                let after = Contrast::of(&ref_matched, &cmp_matched);
                metrics.push(BalanceMetric {
                    name,
                    standardized_difference_before: before.standardized_difference(),
                    standardized_difference: after.standardized_difference(),
                    reference_mean: after.reference_mean,
                    comparison_mean: after.comparison_mean,
                    reference_std: after.reference_std,
                    comparison_std: after.comparison_std,
                });
            }
        }

        let summary = self.calculate_summary_statistics(&metrics);
        info!(
            "Balance assessment complete: {} of {} comparisons imbalanced (stdiff > {})",
            summary.imbalanced_covariates, summary.total_covariates, self.imbalance_threshold
        );
        BalanceReport { metrics, summary }
    }

    fn calculate_summary_statistics(&self, metrics: &[BalanceMetric]) -> BalanceSummary {
        let after: Vec<f64> = metrics.iter().map(|m| m.standardized_difference.abs()).collect();
        let before_max = metrics
            .iter()
            .map(|m| m.standardized_difference_before.abs())
            .fold(0.0, f64::max);

        BalanceSummary {
            imbalanced_covariates: after.iter().filter(|&&d| d > self.imbalance_threshold).count(),
            max_standardized_difference: after.iter().copied().fold(0.0, f64::max),
            max_standardized_difference_before: before_max,
            mean_absolute_standardized_difference: calculate_mean(&after),
            total_covariates: metrics.len(),
        }
    }
}

struct Contrast {
    reference_mean: f64,
    comparison_mean: f64,
    reference_std: f64,
    comparison_std: f64,
}

impl Contrast {
    fn of(reference: &[f64], comparison: &[f64]) -> Self {
        let reference_mean = calculate_mean(reference);
        let comparison_mean = calculate_mean(comparison);
        Self {
            reference_mean,
            comparison_mean,
            reference_std: calculate_std_dev(reference, reference_mean),
            comparison_std: calculate_std_dev(comparison, comparison_mean),
        }
    }

    fn standardized_difference(&self) -> f64 {
        calculate_standardized_difference(
            self.reference_mean,
            self.comparison_mean,
            self.reference_std,
            self.comparison_std,
        )
    }
}

fn calculate_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn calculate_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let variance =
        values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn calculate_standardized_difference(mean1: f64, mean2: f64, std1: f64, std2: f64) -> f64 {
    if std1 == 0.0 && std2 == 0.0 {
        return 0.0;
    }
    let pooled_std = (std2.mul_add(std2, std1.powi(2)) / 2.0).sqrt();
    if pooled_std > 0.0 {
        (mean1 - mean2) / pooled_std
    } else {
        0.0
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
