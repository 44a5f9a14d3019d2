//! Console output utilities
//!
//! This module provides formatted console output for finished runs.

use crate::algorithm::matching::MatchingResult;
use crate::config::MatchingConfig;

/// Print a summary of a finished matching run
pub fn print_match_summary(config: &MatchingConfig, result: &MatchingResult) {
    println!("{}", config.to_string_representation());
    println!(
        "Committed {} match set(s) with {} subject(s) in {:?}",
        result.set_count(),
        result.matched_count(),
        result.matching_time
    );
    for (group, matched) in &result.matched_per_group {
        println!("  - group {group}: {matched} matched");
    }
}

/// Print the balance table of a finished run
pub fn print_balance(result: &MatchingResult) {
    println!("{}", result.balance);
}
