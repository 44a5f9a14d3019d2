//! Type definitions for the matching algorithm
//!
//! This module contains the result type handed back to callers.

use std::time::Duration;

use crate::algorithm::matching::balance::BalanceReport;
use crate::algorithm::matching::match_set::{MatchRecord, MatchSet};

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Committed sets in output order
    pub sets: Vec<MatchSet>,
    /// One row per matched member, numbered by set
    pub records: Vec<MatchRecord>,
    /// Group indicators and how many of each group were matched
    pub matched_per_group: Vec<(String, usize)>,
    /// Score balance before and after matching
    pub balance: BalanceReport,
    /// Time taken for matching
    pub matching_time: Duration,
}

impl MatchingResult {
    /// Number of committed sets
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Total number of matched subjects
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
