//! Spatial indexes over candidate keys
//!
//! Two forms share the [`SpatialIndex`] contract: [`OrderedIndex`] for
//! single-score (two-group) matching and [`KdTree`] for score vectors.
//! Both store candidate pool indices and never return a deleted item.

pub mod kdtree;
pub mod ordered;

use std::cmp::Ordering;

pub use kdtree::KdTree;
pub use ordered::{OrderedIndex, ScoreKey};

use crate::error::{MatchError, Result};

/// Query result: an item and its distance from the query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Candidate pool index
    pub item: usize,
    /// Euclidean distance to the query point
    pub distance: f64,
}

impl Neighbor {
    /// Order by distance, then item
    #[must_use]
    pub fn cmp_by_distance(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.item.cmp(&other.item))
    }
}

/// Shared contract of the 1-D and k-D indexes
pub trait SpatialIndex {
    /// Number of coordinates per point
    fn dimensions(&self) -> usize;

    /// Number of live (not deleted) items
    fn len(&self) -> usize;

    /// Check if no live items remain
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closest live item; ties resolve to the lower item
    fn nearest(&self, point: &[f64]) -> Option<Neighbor>;

    /// Every live item within `radius`, ascending by distance then item
    fn nearest_within(&self, point: &[f64], radius: f64) -> Vec<Neighbor>;

    /// Remove an item stored at `point`; returns `false` if it was not live
    fn delete(&mut self, item: usize, point: &[f64]) -> bool;

    /// Nearest query on an index that must not be empty
    fn require_nearest(&self, point: &[f64]) -> Result<Neighbor> {
        self.nearest(point).ok_or_else(|| {
            MatchError::IndexInvariant(format!(
                "nearest query returned nothing from an index holding {} live point(s)",
                self.len()
            ))
        })
    }
}
