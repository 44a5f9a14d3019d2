//! Core matching orchestration
//!
//! This module implements the Matcher struct which drives one run: validate,
//! build the candidate pool, run the configured strategy, then collapse and
//! enforce the ratio for two-group algorithms.

use std::time::Instant;

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::algorithm::matching::balance::BalanceCalculator;
use crate::algorithm::matching::candidate::{CandidatePool, SubjectRecord};
use crate::algorithm::matching::collapse::{collapse_by_treatment, enforce_ratio};
use crate::algorithm::matching::match_set::to_records;
use crate::algorithm::matching::strategy;
use crate::algorithm::matching::types::MatchingResult;
use crate::algorithm::matching::validation::validate_records;
use crate::config::MatchingConfig;
use crate::error::Result;

/// Matcher for building matched cohorts
#[derive(Debug)]
pub struct Matcher {
    /// Matching configuration
    config: MatchingConfig,
}

impl Matcher {
    /// Create a new matcher with the given configuration
    #[must_use]
    pub const fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Match the given subjects
    ///
    /// Any error discards the whole run. Subjects that find no partner
    /// inside the caliper are simply absent from the result.
    pub fn perform_matching(&self, records: Vec<SubjectRecord>) -> Result<MatchingResult> {
        let start_time = Instant::now();
        let config = &self.config;

        config.validate()?;
        let labels = validate_records(&records, config)?;

        info!(
            "Matching {} subjects in {} groups with {}",
            records.len(),
            labels.len(),
            config.algorithm
        );

        let mut rng = StdRng::seed_from_u64(config.seed());
        let mut pool = CandidatePool::new(records, &labels, &mut rng)?;
        for group in pool.groups() {
            info!("Group '{}': {} subject(s)", group.name(), group.len());
        }

        let committed = strategy::run(&mut pool, config, &mut rng)?;
        let sets = if config.algorithm.is_two_group() {
            let collapsed = collapse_by_treatment(&pool, committed);
            enforce_ratio(collapsed, config.match_ratio, config.fixed_ratio)
        } else {
            committed
        };

        let records = to_records(&pool, &sets);
        let mut matched_counts = vec![0usize; pool.num_groups()];
        for set in &sets {
            for &m in &set.members {
                matched_counts[pool.get(m).group_index] += 1;
            }
        }
        let matched_per_group = pool
            .groups()
            .iter()
            .map(|g| (g.name().to_string(), matched_counts[g.index()]))
            .collect();

        let balance = BalanceCalculator::new().calculate_balance(&pool, &sets);
        let elapsed = start_time.elapsed();

        if sets.is_empty() {
            warn!("No matches found for any subject");
        } else {
            info!(
                "Matching complete: {} set(s) with {} subject(s) in {:.2?}",
                sets.len(),
                records.len(),
                elapsed
            );
        }

        Ok(MatchingResult {
            sets,
            records,
            matched_per_group,
            balance,
            matching_time: elapsed,
        })
    }
}
