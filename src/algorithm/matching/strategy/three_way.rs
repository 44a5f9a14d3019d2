//! Three-way matching by triangle perimeter
//!
//! The smallest group is the base; the other two groups each get a KD-tree.
//! For every base point a branch-and-bound search finds its cheapest
//! triangles, where a triangle's cost is its perimeter. Triangles are
//! resolved cheapest first. Committed points are deleted from their trees,
//! and a base point whose queued triangles have all been invalidated is
//! searched again against what is left.

use std::collections::BinaryHeap;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::distance::{euclidean_distance, perimeter};
use crate::algorithm::matching::index::{KdTree, Neighbor, SpatialIndex};
use crate::algorithm::matching::match_set::{MatchSet, Members, TupleProposal};
use crate::algorithm::matching::strategy::nway::{build_tree, smallest_group};
use crate::config::MatchingConfig;
use crate::error::Result;

/// How many times a search limit may double before giving up
const MAX_WIDENINGS: usize = 8;

/// Slack on radius comparisons so the seeding triangle is always found
const SLACK: f64 = 1e-12;

/// Ranked triangle during one search; max-heap on perimeter
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ranked {
    perimeter: f64,
    first: usize,
    second: usize,
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.perimeter
            .total_cmp(&other.perimeter)
            .then(self.first.cmp(&other.first))
            .then(self.second.cmp(&other.second))
    }
}

/// Run three-way matching
pub fn match_three_way(pool: &mut CandidatePool, config: &MatchingConfig) -> Result<Vec<MatchSet>> {
    let base = smallest_group(pool);
    let others: Vec<usize> = (0..pool.num_groups()).filter(|&g| g != base).collect();
    let dims = config.score_dimensions();
    let caliper = config.effective_caliper();
    let wanted = config.triangles_per_query;

    let mut first_tree = build_tree(pool, others[0], dims);
    let mut second_tree = build_tree(pool, others[1], dims);
    let base_members = pool.unmatched(base);
    info!(
        "three-way: base group '{}' with {} unit(s)",
        pool.group(base).name(),
        base_members.len()
    );

    let mut heap = BinaryHeap::new();
    let mut open: FxHashMap<usize, usize> = FxHashMap::default();
    for &b in &base_members {
        let found = cheapest_triangles(pool, b, base, &first_tree, &second_tree, wanted, caliper)?;
        open.insert(b, found.len());
        heap.extend(found);
    }

    let mut sets = Vec::new();
    let mut searches = base_members.len();
    while let Some(triangle) = heap.pop() {
        let b = triangle.members[base];
        let remaining = open.get_mut(&b).map_or(0, |n| {
            *n = n.saturating_sub(1);
            *n
        });

        if triangle.members.iter().all(|&m| !pool.is_matched(m)) {
            for &m in &triangle.members {
                pool.mark_matched(m);
            }
            let (x, y) = non_base(&triangle.members, base);
            first_tree.delete(x, &pool.get(x).key);
            second_tree.delete(y, &pool.get(y).key);
            sets.push(MatchSet::tuple(triangle.members, triangle.distance));
            continue;
        }

        if remaining == 0 && !pool.is_matched(b) && !first_tree.is_empty() && !second_tree.is_empty() {
            let found = cheapest_triangles(pool, b, base, &first_tree, &second_tree, wanted, caliper)?;
            open.insert(b, found.len());
            heap.extend(found);
            searches += 1;
        }
    }

    debug!("three-way: {} triangle(s) from {searches} search(es)", sets.len());
    Ok(sets)
}

fn non_base(members: &Members, base: usize) -> (usize, usize) {
    let mut rest = members
        .iter()
        .enumerate()
        .filter(|&(g, _)| g != base)
        .map(|(_, &m)| m);
    let x = rest.next().unwrap_or_default();
    let y = rest.next().unwrap_or_default();
    (x, y)
}

/// Up to `wanted` cheapest triangles around base point `b` inside the caliper
fn cheapest_triangles(
    pool: &CandidatePool,
    b: usize,
    base: usize,
    first_tree: &KdTree,
    second_tree: &KdTree,
    wanted: usize,
    caliper: f64,
) -> Result<Vec<TupleProposal>> {
    let point = pool.get(b).key.as_slice();
    let x0 = first_tree.require_nearest(point)?;
    let y0 = second_tree.require_nearest(point)?;
    let mut limit = perimeter(point, &pool.get(x0.item).key, &pool.get(y0.item).key);

    let mut best = Vec::new();
    for widening in 0..=MAX_WIDENINGS {
        let (found, exhaustive) = search_within(pool, point, limit, first_tree, second_tree, wanted);
        best = found;
        if best.len() >= wanted || exhaustive || widening == MAX_WIDENINGS {
            break;
        }
        limit = if limit > 0.0 { limit * 2.0 } else { SLACK };
    }

    Ok(best
        .into_iter()
        .filter_map(|t| {
            let (bp, xp, yp) = (&pool.get(b).scores, &pool.get(t.first).scores, &pool.get(t.second).scores);
            let distance = perimeter(bp, xp, yp);
            (distance <= caliper).then(|| {
                let mut members = Members::with_capacity(3);
                let picks = [t.first, t.second];
                members.extend(picks[..base].iter().copied());
                members.push(b);
                members.extend(picks[base..].iter().copied());
                TupleProposal { distance, members }
            })
        })
        .collect())
}

/// Branch and bound over triangles with perimeter at most `limit`
///
/// Any triangle through `point` has perimeter at least twice the distance
/// from `point` to either other corner, so both corner lists are cut at
/// `limit / 2` and each loop stops once twice the corner distance exceeds
/// the current bound. Returns the triangles ascending and whether both lists
/// covered their whole tree.
fn search_within(
    pool: &CandidatePool,
    point: &[f64],
    limit: f64,
    first_tree: &KdTree,
    second_tree: &KdTree,
    wanted: usize,
) -> (Vec<Ranked>, bool) {
    let radius = limit / 2.0 + SLACK;
    let xs: Vec<Neighbor> = first_tree.nearest_within(point, radius);
    let ys: Vec<Neighbor> = second_tree.nearest_within(point, radius);
    let exhaustive = xs.len() == first_tree.len() && ys.len() == second_tree.len();

    let mut kept: BinaryHeap<Ranked> = BinaryHeap::new();
    let bound = |kept: &BinaryHeap<Ranked>| match kept.peek() {
        Some(worst) if kept.len() >= wanted => worst.perimeter.min(limit),
        _ => limit,
    };

    for x in &xs {
        if 2.0 * x.distance > bound(&kept) + SLACK {
            break;
        }
        let x_key = &pool.get(x.item).key;
        for y in &ys {
            let current = bound(&kept);
            if 2.0 * y.distance > current + SLACK {
                break;
            }
            let p = x.distance + y.distance + euclidean_distance(x_key, &pool.get(y.item).key);
            if p > current + SLACK {
                continue;
            }
            kept.push(Ranked {
                perimeter: p,
                first: x.item,
                second: y.item,
            });
            if kept.len() > wanted {
                kept.pop();
            }
        }
    }

    (kept.into_sorted_vec(), exhaustive)
}
