//! Candidate records for the matching algorithm
//!
//! Every subject of a run lives in one [`CandidatePool`]. Indexes, heaps and
//! match sets refer to candidates by their position in the pool, so nothing
//! outside the pool ever owns subject data.

use rand::Rng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::algorithm::matching::distance::euclidean_distance;
use crate::algorithm::matching::group::MatchGroup;
use crate::error::{MatchError, Result};

/// Score vector; inline for up to four coordinates (five groups)
pub type Scores = SmallVec<[f64; 4]>;

/// Width of the random jitter added to index keys
pub const PERTURBATION: f64 = 1e-9;

/// One input row: patient id, group indicator and propensity scores
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    /// Patient identifier, unique across the whole input
    pub id: String,
    /// Group (exposure) indicator
    pub group: String,
    /// Propensity scores, one per non-reference group
    pub scores: Vec<f64>,
}

impl SubjectRecord {
    /// Create a record from already parsed values
    pub fn new(id: impl Into<String>, group: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            scores,
        }
    }
}

/// Whether a candidate has been committed to a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Still available
    Unmatched,
    /// Committed to at least one match
    Matched,
}

/// Position of a referent relative to its treatment unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Referent score below the treatment score
    Left,
    /// Referent score at or above the treatment score
    Right,
}

impl Side {
    /// The other side
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Match counters kept for treatment units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceCounts {
    /// Number of referents matched so far
    pub total: usize,
    /// Referents matched from below
    pub left: usize,
    /// Referents matched from above
    pub right: usize,
}

impl BalanceCounts {
    /// Counts after one more match on `side`
    #[must_use]
    pub const fn with(self, side: Side) -> Self {
        match side {
            Side::Left => Self {
                total: self.total + 1,
                left: self.left + 1,
                right: self.right,
            },
            Side::Right => Self {
                total: self.total + 1,
                left: self.left,
                right: self.right + 1,
            },
        }
    }

    /// Whether left and right counts are within one of each other
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.left.abs_diff(self.right) <= 1
    }
}

/// A subject taking part in matching
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Patient identifier
    pub id: String,
    /// Group indicator
    pub group: String,
    /// Dense index of the group within the pool
    pub group_index: usize,
    /// Propensity scores as read
    pub scores: Scores,
    /// Scores plus run-specific jitter; only used for ordering
    pub key: Scores,
    status: MatchStatus,
    /// Match counters (treatment units only)
    pub balance: BalanceCounts,
}

impl Candidate {
    /// First score coordinate
    #[must_use]
    pub fn score(&self) -> f64 {
        self.scores[0]
    }

    /// First key coordinate
    #[must_use]
    pub fn key1(&self) -> f64 {
        self.key[0]
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> MatchStatus {
        self.status
    }

    /// Whether the candidate has been matched
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.status == MatchStatus::Matched
    }
}

/// All candidates of one run, partitioned into match groups
#[derive(Debug, Clone)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    groups: Vec<MatchGroup>,
}

impl CandidatePool {
    /// Build the pool from records whose groups are listed in `group_labels`
    ///
    /// Group `i` of the pool is `group_labels[i]`. Each score receives a
    /// jitter drawn from `rng` in input order, so keys are reproducible for a
    /// fixed seed.
    pub fn new(records: Vec<SubjectRecord>, group_labels: &[String], rng: &mut StdRng) -> Result<Self> {
        let label_index: FxHashMap<&str, usize> = group_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();

        let mut groups: Vec<MatchGroup> = group_labels
            .iter()
            .enumerate()
            .map(|(i, label)| MatchGroup::new(label.clone(), i))
            .collect();

        let mut candidates = Vec::with_capacity(records.len());
        for record in records {
            let group_index = *label_index.get(record.group.as_str()).ok_or_else(|| {
                MatchError::parse(
                    record.id.as_str(),
                    format!("group '{}' is not a configured group", record.group),
                )
            })?;

            let scores: Scores = record.scores.iter().copied().collect();
            let key: Scores = scores
                .iter()
                .map(|s| s + (rng.random::<f64>() - 0.5) * PERTURBATION)
                .collect();

            groups[group_index].push(candidates.len());
            candidates.push(Candidate {
                id: record.id,
                group: record.group,
                group_index,
                scores,
                key,
                status: MatchStatus::Unmatched,
                balance: BalanceCounts::default(),
            });
        }

        for group in &mut groups {
            group.sort_by_score(&candidates);
        }

        Ok(Self { candidates, groups })
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if the pool is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate by index
    #[must_use]
    pub fn get(&self, idx: usize) -> &Candidate {
        &self.candidates[idx]
    }

    /// All candidates in input order
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Number of groups
    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Group by index
    #[must_use]
    pub fn group(&self, index: usize) -> &MatchGroup {
        &self.groups[index]
    }

    /// All groups
    #[must_use]
    pub fn groups(&self) -> &[MatchGroup] {
        &self.groups
    }

    /// Whether a candidate has been matched
    #[must_use]
    pub fn is_matched(&self, idx: usize) -> bool {
        self.candidates[idx].is_matched()
    }

    /// Mark a candidate matched; returns `true` on the first transition only
    pub fn mark_matched(&mut self, idx: usize) -> bool {
        let candidate = &mut self.candidates[idx];
        if candidate.status == MatchStatus::Matched {
            return false;
        }
        candidate.status = MatchStatus::Matched;
        true
    }

    /// Record one more referent for a treatment unit and mark it matched
    pub fn record_match(&mut self, treatment: usize, side: Side) -> BalanceCounts {
        self.mark_matched(treatment);
        let candidate = &mut self.candidates[treatment];
        candidate.balance = candidate.balance.with(side);
        candidate.balance
    }

    /// Unmatched members of a group, in the group's current order
    #[must_use]
    pub fn unmatched(&self, group: usize) -> Vec<usize> {
        self.groups[group]
            .members()
            .iter()
            .copied()
            .filter(|&i| !self.candidates[i].is_matched())
            .collect()
    }

    /// Distance between two candidates on their reported scores
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        euclidean_distance(&self.candidates[a].scores, &self.candidates[b].scores)
    }

    /// Side of `referent` relative to `treatment` by key
    #[must_use]
    pub fn side_of(&self, treatment: usize, referent: usize) -> Side {
        if self.candidates[referent].key1() < self.candidates[treatment].key1() {
            Side::Left
        } else {
            Side::Right
        }
    }
}
