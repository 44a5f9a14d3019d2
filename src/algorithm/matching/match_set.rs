//! Match sets and proposal heap entries
//!
//! A proposal is a candidate pair or tuple waiting in a min-heap. Popping it
//! either commits it as a [`MatchSet`] or discards it. Heap entries order by
//! distance first and member indices second, so the pop order is total and
//! does not depend on insertion order.

use std::cmp::Ordering;

use smallvec::{SmallVec, smallvec};

use crate::algorithm::matching::candidate::CandidatePool;

/// Member list of a set; inline for up to four members
pub type Members = SmallVec<[usize; 4]>;

/// A committed group of matched candidates
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSet {
    /// Candidate indices; the treatment unit comes first when there is one
    pub members: Members,
    /// Treatment unit for two-group algorithms
    pub treatment: Option<usize>,
    /// Summed (or penalized) distance of the set
    pub distance: f64,
    /// Provenance text
    pub info: Option<String>,
}

impl MatchSet {
    /// One treatment unit and one referent
    #[must_use]
    pub fn pair(treatment: usize, referent: usize, distance: f64, info: impl Into<String>) -> Self {
        Self {
            members: smallvec![treatment, referent],
            treatment: Some(treatment),
            distance,
            info: Some(info.into()),
        }
    }

    /// One member per group, ordered by group index
    #[must_use]
    pub const fn tuple(members: Members, distance: f64) -> Self {
        Self {
            members,
            treatment: None,
            distance,
            info: None,
        }
    }

    /// Every member of one block
    #[must_use]
    pub fn block(members: Vec<usize>, distance: f64) -> Self {
        Self {
            members: Members::from_vec(members),
            treatment: None,
            distance,
            info: None,
        }
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the set has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members other than the treatment unit
    pub fn referents(&self) -> impl Iterator<Item = usize> + '_ {
        self.members
            .iter()
            .copied()
            .filter(move |&m| Some(m) != self.treatment)
    }
}

/// One output row per matched member
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// 1-based number of the set the member belongs to
    pub set_number: usize,
    /// Patient identifier
    pub patient_id: String,
    /// Group indicator
    pub group: String,
    /// Propensity scores as read
    pub scores: Vec<f64>,
    /// Distance of the whole set
    pub distance: f64,
    /// Provenance, when the algorithm records one
    pub info: Option<String>,
}

/// Flatten committed sets into output rows, numbering sets from 1
#[must_use]
pub fn to_records(pool: &CandidatePool, sets: &[MatchSet]) -> Vec<MatchRecord> {
    sets.iter()
        .enumerate()
        .flat_map(|(n, set)| {
            set.members.iter().map(move |&m| {
                let candidate = pool.get(m);
                MatchRecord {
                    set_number: n + 1,
                    patient_id: candidate.id.clone(),
                    group: candidate.group.clone(),
                    scores: candidate.scores.to_vec(),
                    distance: set.distance,
                    info: set.info.clone(),
                }
            })
        })
        .collect()
}

/// Two-group proposal; min-heap order by distance, treatment, referent
#[derive(Debug, Clone, Copy)]
pub struct PairProposal {
    /// Distance on reported scores
    pub distance: f64,
    /// Treatment candidate index
    pub treatment: usize,
    /// Referent candidate index
    pub referent: usize,
}

impl PairProposal {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.treatment.cmp(&other.treatment))
            .then(self.referent.cmp(&other.referent))
    }
}

impl PartialEq for PairProposal {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for PairProposal {}

impl PartialOrd for PairProposal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PairProposal {
    // reversed so BinaryHeap pops the cheapest pair
    fn cmp(&self, other: &Self) -> Ordering {
        other.key_cmp(self)
    }
}

/// Multi-group proposal; min-heap order by distance, then members
#[derive(Debug, Clone)]
pub struct TupleProposal {
    /// Penalized distance or perimeter
    pub distance: f64,
    /// One candidate per group, ordered by group index
    pub members: Members,
}

impl TupleProposal {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.members.cmp(&other.members))
    }
}

impl PartialEq for TupleProposal {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for TupleProposal {}

impl PartialOrd for TupleProposal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TupleProposal {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key_cmp(self)
    }
}
