//! Ordered 1-D index
//!
//! A balanced ordered set keyed by `(score, item)`. The item in the key keeps
//! entries unique even when two jittered scores collide.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Included, Unbounded};

use crate::algorithm::matching::distance::scalar_distance;
use crate::algorithm::matching::index::{Neighbor, SpatialIndex};

/// Index key: score with a total order, then item
#[derive(Debug, Clone, Copy)]
pub struct ScoreKey {
    /// Ordering score
    pub score: f64,
    /// Candidate pool index
    pub item: usize,
}

impl ScoreKey {
    /// Create a key
    #[must_use]
    pub const fn new(score: f64, item: usize) -> Self {
        Self { score, item }
    }

    const fn lowest_at(score: f64) -> Self {
        Self { score, item: 0 }
    }

    const fn highest_at(score: f64) -> Self {
        Self {
            score,
            item: usize::MAX,
        }
    }
}

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.item.cmp(&other.item))
    }
}

/// Ordered index over single scores
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    keys: BTreeSet<ScoreKey>,
}

impl OrderedIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(item, score)` pairs
    #[must_use]
    pub fn from_scores(entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        Self {
            keys: entries
                .into_iter()
                .map(|(item, score)| ScoreKey::new(score, item))
                .collect(),
        }
    }

    /// Insert an item; returns `false` if already present
    pub fn insert(&mut self, item: usize, score: f64) -> bool {
        self.keys.insert(ScoreKey::new(score, item))
    }

    /// Remove an item; returns `false` if it was not present
    pub fn remove(&mut self, item: usize, score: f64) -> bool {
        self.keys.remove(&ScoreKey::new(score, item))
    }

    /// Whether an item is present
    #[must_use]
    pub fn contains(&self, item: usize, score: f64) -> bool {
        self.keys.contains(&ScoreKey::new(score, item))
    }

    /// Closest entry with a score strictly below `score`
    #[must_use]
    pub fn below(&self, score: f64) -> Option<ScoreKey> {
        self.keys.range(..ScoreKey::lowest_at(score)).next_back().copied()
    }

    /// Closest entry with a score strictly above `score`
    #[must_use]
    pub fn above(&self, score: f64) -> Option<ScoreKey> {
        self.keys
            .range((Excluded(ScoreKey::highest_at(score)), Unbounded))
            .next()
            .copied()
    }

    /// Closest entry with a score at or above `score`
    #[must_use]
    pub fn at_or_above(&self, score: f64) -> Option<ScoreKey> {
        self.keys.range(ScoreKey::lowest_at(score)..).next().copied()
    }

    /// Entries in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &ScoreKey> {
        self.keys.iter()
    }
}

impl SpatialIndex for OrderedIndex {
    fn dimensions(&self) -> usize {
        1
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn nearest(&self, point: &[f64]) -> Option<Neighbor> {
        let score = point[0];
        let lower = self
            .keys
            .range(..=ScoreKey::highest_at(score))
            .next_back()
            .map(|k| Neighbor {
                item: k.item,
                distance: scalar_distance(score, k.score),
            });
        let upper = self
            .keys
            .range((Excluded(ScoreKey::highest_at(score)), Unbounded))
            .next()
            .map(|k| Neighbor {
                item: k.item,
                distance: scalar_distance(score, k.score),
            });

        match (lower, upper) {
            (Some(l), Some(u)) => Some(if u.cmp_by_distance(&l).is_lt() { u } else { l }),
            (l, u) => l.or(u),
        }
    }

    fn nearest_within(&self, point: &[f64], radius: f64) -> Vec<Neighbor> {
        let score = point[0];
        let pivot = ScoreKey::highest_at(score);

        let mut found: Vec<Neighbor> = self
            .keys
            .range((Unbounded, Included(pivot)))
            .rev()
            .map(|k| Neighbor {
                item: k.item,
                distance: scalar_distance(score, k.score),
            })
            .take_while(|n| n.distance <= radius)
            .collect();

        found.extend(
            self.keys
                .range((Excluded(pivot), Unbounded))
                .map(|k| Neighbor {
                    item: k.item,
                    distance: scalar_distance(score, k.score),
                })
                .take_while(|n| n.distance <= radius),
        );

        found.sort_by(Neighbor::cmp_by_distance);
        found
    }

    fn delete(&mut self, item: usize, point: &[f64]) -> bool {
        self.remove(item, point[0])
    }
}
