//! Propensity-score matching algorithms
//!
//! This module builds matched cohorts from subjects carrying a group
//! indicator and a propensity-score vector. It includes:
//!
//! 1. Candidate pools with per-group score order
//! 2. Spatial indexes (ordered 1-D index and KD-tree)
//! 3. Two-group strategies: nearest-neighbor, balanced, digit greedy, caliper greedy
//! 4. Multi-group strategies: block, N-way and three-way triangle matching
//! 5. Match-set collapsing, ratio enforcement and balance assessment
//!
//! The [`Matcher`] drives one complete run from validated input to output rows.

pub mod balance;
pub mod candidate;
pub mod collapse;
pub mod distance;
pub mod extraction;
pub mod group;
pub mod index;
pub mod match_set;
pub mod matcher;
pub mod parallel;
pub mod strategy;
pub mod types;
pub mod validation;

// Re-export key types
pub use balance::{BalanceCalculator, BalanceMetric, BalanceReport, BalanceSummary};
pub use candidate::{Candidate, CandidatePool, SubjectRecord};
pub use extraction::{ColumnSpec, records_from_batch, records_to_batch};
pub use match_set::{MatchRecord, MatchSet};
pub use matcher::Matcher;
pub use types::MatchingResult;
