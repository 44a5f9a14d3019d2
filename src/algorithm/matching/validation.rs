//! Validation functions for the matching algorithm
//!
//! Input records are checked once, before any candidate is built. A failure
//! here aborts the run.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use crate::config::MatchingConfig;
use crate::algorithm::matching::candidate::SubjectRecord;
use crate::error::{MatchError, Result};

/// Validate records and resolve the group labels in pool order
///
/// Two-group algorithms put the treatment group first and the referent group
/// second. Other algorithms use the labels in sorted order.
pub fn validate_records(records: &[SubjectRecord], config: &MatchingConfig) -> Result<Vec<String>> {
    let dimensions = config.score_dimensions();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut labels: BTreeSet<&str> = BTreeSet::new();

    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(MatchError::DuplicateId(record.id.clone()));
        }

        if record.group.trim().is_empty() {
            return Err(MatchError::parse(record.id.as_str(), "missing group indicator"));
        }

        if record.scores.len() != dimensions {
            return Err(MatchError::parse(
                record.id.as_str(),
                format!(
                    "expected {dimensions} score(s) for {} groups, found {}",
                    config.num_groups,
                    record.scores.len()
                ),
            ));
        }

        if let Some(bad) = record.scores.iter().find(|s| !s.is_finite()) {
            return Err(MatchError::parse(
                record.id.as_str(),
                format!("score {bad} is not a finite number"),
            ));
        }

        labels.insert(record.group.as_str());
    }

    if labels.len() > config.num_groups {
        return Err(MatchError::Config(format!(
            "Input contains {} groups ({}) but {} were configured",
            labels.len(),
            labels.iter().copied().collect::<Vec<_>>().join(", "),
            config.num_groups
        )));
    }

    if config.algorithm.is_two_group() {
        let treatment = config.treatment_group.as_str();
        if !labels.contains(treatment) {
            return Err(MatchError::EmptyGroup(treatment.to_string()));
        }
        let referent = labels
            .iter()
            .find(|&&label| label != treatment)
            .ok_or_else(|| MatchError::EmptyGroup(format!("referent (not '{treatment}')")))?;
        return Ok(vec![treatment.to_string(), (*referent).to_string()]);
    }

    if labels.len() < config.num_groups {
        return Err(MatchError::EmptyGroup(format!(
            "{} of {} configured groups have members",
            labels.len(),
            config.num_groups
        )));
    }

    Ok(labels.into_iter().map(str::to_string).collect())
}
