//! KD-tree over score vectors
//!
//! ## Design notes
//!
//! * **Median Splitting**: balanced construction via `select_nth_unstable_by`
//!   on alternating axes, O(n log n).
//! * **Squared distances**: every comparison during a query works on squared
//!   distances; a square root is taken once per reported neighbour.
//! * **Lazy deletion**: `delete` flags the node and propagates an "all
//!   descendants deleted" flag upward, so later queries skip dead subtrees
//!   without rebuilding.
//!
//! ## Invariants
//!
//! * Splits order points by `(coordinate, item)`, so every stored point has a
//!   unique path from the root.
//! * A deleted item is never returned by any later query.
//! * Queries take `&self`; a tree can be shared across threads while no one
//!   deletes from it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::algorithm::matching::candidate::Scores;
use crate::algorithm::matching::distance::squared_distance;
use crate::algorithm::matching::index::{Neighbor, SpatialIndex};

#[derive(Debug, Clone)]
struct KdNode {
    point: Scores,
    item: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
    deleted: bool,
    subtree_deleted: bool,
}

/// Candidate found during a query; max-heap order by squared distance
#[derive(Debug, Clone, Copy)]
struct Ranked {
    dist_sq: f64,
    item: usize,
}

impl Ranked {
    fn beats(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Less
    }

    fn into_neighbor(self) -> Neighbor {
        Neighbor {
            item: self.item,
            distance: self.dist_sq.sqrt(),
        }
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.item.cmp(&other.item))
    }
}

/// Multidimensional binary spatial index with lazy deletion
#[derive(Debug, Clone)]
pub struct KdTree {
    dims: usize,
    nodes: Vec<KdNode>,
    root: Option<usize>,
    live: usize,
}

impl KdTree {
    /// Build a tree from `(item, point)` pairs; every point has `dims` coordinates
    #[must_use]
    pub fn build(dims: usize, mut entries: Vec<(usize, Scores)>) -> Self {
        debug_assert!(dims > 0);
        debug_assert!(entries.iter().all(|(_, p)| p.len() == dims));

        let mut nodes = Vec::with_capacity(entries.len());
        let root = Self::build_recursive(&mut nodes, &mut entries, dims, 0, None);
        Self {
            dims,
            live: nodes.len(),
            nodes,
            root,
        }
    }

    fn build_recursive(
        nodes: &mut Vec<KdNode>,
        entries: &mut [(usize, Scores)],
        dims: usize,
        depth: usize,
        parent: Option<usize>,
    ) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        let axis = depth % dims;
        let mid = entries.len() / 2;
        entries.select_nth_unstable_by(mid, |a, b| {
            a.1[axis].total_cmp(&b.1[axis]).then(a.0.cmp(&b.0))
        });

        let slot = nodes.len();
        nodes.push(KdNode {
            point: entries[mid].1.clone(),
            item: entries[mid].0,
            axis,
            left: None,
            right: None,
            parent,
            deleted: false,
            subtree_deleted: false,
        });

        let (left, rest) = entries.split_at_mut(mid);
        let right = &mut rest[1..];
        let left_slot = Self::build_recursive(nodes, left, dims, depth + 1, Some(slot));
        let right_slot = Self::build_recursive(nodes, right, dims, depth + 1, Some(slot));
        nodes[slot].left = left_slot;
        nodes[slot].right = right_slot;

        Some(slot)
    }

    /// Number of stored points, including deleted ones
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Direction of a query from a node along the node's split axis
    fn split_order(node: &KdNode, point: &[f64], item: usize) -> Ordering {
        point[node.axis]
            .total_cmp(&node.point[node.axis])
            .then(item.cmp(&node.item))
    }

    fn find_slot(&self, item: usize, point: &[f64]) -> Option<usize> {
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let node = &self.nodes[slot];
            if node.subtree_deleted {
                return None;
            }
            cursor = match Self::split_order(node, point, item) {
                Ordering::Equal => return Some(slot),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    fn propagate_deleted(&mut self, slot: usize) {
        let mut cursor = Some(slot);
        while let Some(s) = cursor {
            let node = &self.nodes[s];
            let dead_child = |child: Option<usize>| child.is_none_or(|c| self.nodes[c].subtree_deleted);
            if !(node.deleted && dead_child(node.left) && dead_child(node.right)) {
                break;
            }
            self.nodes[s].subtree_deleted = true;
            cursor = self.nodes[s].parent;
        }
    }

    fn nearest_recursive(&self, slot: usize, point: &[f64], best: &mut Option<Ranked>) {
        let node = &self.nodes[slot];
        if node.subtree_deleted {
            return;
        }

        if !node.deleted {
            let found = Ranked {
                dist_sq: squared_distance(point, &node.point),
                item: node.item,
            };
            if best.is_none_or(|b| found.beats(&b)) {
                *best = Some(found);
            }
        }

        let diff = point[node.axis] - node.point[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(n) = near {
            self.nearest_recursive(n, point, best);
        }
        if let Some(f) = far {
            if best.is_none_or(|b| diff * diff <= b.dist_sq) {
                self.nearest_recursive(f, point, best);
            }
        }
    }

    /// Live items within `radius`, keeping at most `limit` closest ones
    #[must_use]
    pub fn nearest_within_limited(&self, point: &[f64], radius: f64, limit: usize) -> Vec<Neighbor> {
        if limit == 0 || radius < 0.0 {
            return Vec::new();
        }
        let mut heap = BinaryHeap::new();
        if let Some(root) = self.root {
            self.within_recursive(root, point, radius * radius, limit, &mut heap);
        }
        heap.into_sorted_vec()
            .into_iter()
            .map(Ranked::into_neighbor)
            .collect()
    }

    fn within_recursive(
        &self,
        slot: usize,
        point: &[f64],
        radius_sq: f64,
        limit: usize,
        heap: &mut BinaryHeap<Ranked>,
    ) {
        let node = &self.nodes[slot];
        if node.subtree_deleted {
            return;
        }

        if !node.deleted {
            let found = Ranked {
                dist_sq: squared_distance(point, &node.point),
                item: node.item,
            };
            if found.dist_sq <= radius_sq {
                heap.push(found);
                if heap.len() > limit {
                    heap.pop();
                }
            }
        }

        let diff = point[node.axis] - node.point[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(n) = near {
            self.within_recursive(n, point, radius_sq, limit, heap);
        }
        if let Some(f) = far {
            let bound = match heap.peek() {
                Some(worst) if heap.len() == limit => radius_sq.min(worst.dist_sq),
                _ => radius_sq,
            };
            if diff * diff <= bound {
                self.within_recursive(f, point, radius_sq, limit, heap);
            }
        }
    }
}

impl SpatialIndex for KdTree {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.live
    }

    fn nearest(&self, point: &[f64]) -> Option<Neighbor> {
        let mut best = None;
        if let Some(root) = self.root {
            self.nearest_recursive(root, point, &mut best);
        }
        best.map(Ranked::into_neighbor)
    }

    fn nearest_within(&self, point: &[f64], radius: f64) -> Vec<Neighbor> {
        self.nearest_within_limited(point, radius, usize::MAX)
    }

    fn delete(&mut self, item: usize, point: &[f64]) -> bool {
        let Some(slot) = self.find_slot(item, point) else {
            return false;
        };
        if self.nodes[slot].deleted {
            return false;
        }
        self.nodes[slot].deleted = true;
        self.live -= 1;
        self.propagate_deleted(slot);
        true
    }
}
