//! Match groups and score-ordered neighbour links
//!
//! [`MatchGroup`] is the ordered member list of one exposure group.
//! [`GroupOrder`] is a dense, score-sorted array of candidate indices with
//! integer prev/next links, used to walk outward from a unit to its next
//! still-available neighbour.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;

use crate::algorithm::matching::candidate::Candidate;

/// Ordered, named collection of candidates sharing one group tag
#[derive(Debug, Clone)]
pub struct MatchGroup {
    name: String,
    index: usize,
    members: Vec<usize>,
}

impl MatchGroup {
    /// Create an empty group
    #[must_use]
    pub const fn new(name: String, index: usize) -> Self {
        Self {
            name,
            index,
            members: Vec::new(),
        }
    }

    /// Group indicator
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dense group index
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Member candidate indices in current order
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Append a member
    pub fn push(&mut self, candidate: usize) {
        self.members.push(candidate);
    }

    /// Members passing `keep`, in an order drawn from the run's seeded RNG
    ///
    /// The group itself stays in score order.
    pub fn shuffled<F>(&self, rng: &mut StdRng, keep: F) -> Vec<usize>
    where
        F: FnMut(&usize) -> bool,
    {
        let mut picked: Vec<usize> = self.members.iter().copied().filter(keep).collect();
        picked.shuffle(rng);
        picked
    }

    /// Sort members by ordering key (first coordinate, then the rest)
    pub fn sort_by_score(&mut self, candidates: &[Candidate]) {
        self.members
            .sort_unstable_by(|&a, &b| compare_keys(&candidates[a], a, &candidates[b], b));
    }
}

/// Total order on candidates by key vector, then by pool index
#[must_use]
pub fn compare_keys(a: &Candidate, a_idx: usize, b: &Candidate, b_idx: usize) -> Ordering {
    a.key
        .iter()
        .zip(b.key.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
        .then(a_idx.cmp(&b_idx))
}

/// Score-sorted members of one group with removable prev/next links
///
/// Unlinked slots keep their own links, so a walk may start from a removed
/// candidate and still reaches the nearest live neighbour in that direction.
#[derive(Debug, Clone)]
pub struct GroupOrder {
    order: Vec<usize>,
    prev: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
    live: Vec<bool>,
    position: FxHashMap<usize, usize>,
}

impl GroupOrder {
    /// Build from candidate indices already sorted by key
    #[must_use]
    pub fn new(sorted: Vec<usize>) -> Self {
        let n = sorted.len();
        let position = sorted.iter().enumerate().map(|(pos, &c)| (c, pos)).collect();
        Self {
            prev: (0..n).map(|pos| pos.checked_sub(1)).collect(),
            next: (0..n).map(|pos| (pos + 1 < n).then_some(pos + 1)).collect(),
            live: vec![true; n],
            order: sorted,
            position,
        }
    }

    /// Number of slots, live or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the order has no slots
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a candidate is present and not unlinked
    #[must_use]
    pub fn contains(&self, candidate: usize) -> bool {
        self.position
            .get(&candidate)
            .is_some_and(|&pos| self.live[pos])
    }

    /// Remove a candidate from the live chain
    pub fn unlink(&mut self, candidate: usize) -> bool {
        let Some(&pos) = self.position.get(&candidate) else {
            return false;
        };
        if !self.live[pos] {
            return false;
        }
        self.live[pos] = false;
        if let Some(p) = self.prev[pos] {
            self.next[p] = self.next[pos];
        }
        if let Some(n) = self.next[pos] {
            self.prev[n] = self.prev[pos];
        }
        true
    }

    /// Nearest live candidate ordered strictly before `candidate`
    #[must_use]
    pub fn live_before(&self, candidate: usize) -> Option<usize> {
        let mut cursor = self.prev[*self.position.get(&candidate)?];
        while let Some(pos) = cursor {
            if self.live[pos] {
                return Some(self.order[pos]);
            }
            cursor = self.prev[pos];
        }
        None
    }

    /// Nearest live candidate ordered strictly after `candidate`
    #[must_use]
    pub fn live_after(&self, candidate: usize) -> Option<usize> {
        let mut cursor = self.next[*self.position.get(&candidate)?];
        while let Some(pos) = cursor {
            if self.live[pos] {
                return Some(self.order[pos]);
            }
            cursor = self.next[pos];
        }
        None
    }
}
