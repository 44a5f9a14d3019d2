//! N-way nearest-neighbor matching across three or more groups
//!
//! The smallest group is the base. Every base unit finds its nearest
//! neighbour in each other group, widens the search to a radius derived from
//! that tentative tuple, and scores every combination of the candidates it
//! found. All tuples inside the caliper go into one heap, which is resolved
//! cheapest first.

use std::collections::BinaryHeap;

use itertools::Itertools;
use log::info;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::distance::{penalized_distance, spread};
use crate::algorithm::matching::index::{KdTree, Neighbor, SpatialIndex};
use crate::algorithm::matching::match_set::{MatchSet, Members, TupleProposal};
use crate::algorithm::matching::parallel::build_tuple_heap;
use crate::config::MatchingConfig;
use crate::error::Result;

/// Smallest group; ties go to the lowest group index
#[must_use]
pub fn smallest_group(pool: &CandidatePool) -> usize {
    (0..pool.num_groups())
        .min_by_key(|&g| (pool.group(g).len(), g))
        .unwrap_or(0)
}

/// KD-tree over the keys of one group's unmatched members
#[must_use]
pub fn build_tree(pool: &CandidatePool, group: usize, dims: usize) -> KdTree {
    KdTree::build(
        dims,
        pool.unmatched(group)
            .into_iter()
            .map(|c| (c, pool.get(c).key.clone()))
            .collect(),
    )
}

/// Run N-way matching
pub fn match_n_way(pool: &mut CandidatePool, config: &MatchingConfig) -> Result<Vec<MatchSet>> {
    let base = smallest_group(pool);
    let others: Vec<usize> = (0..pool.num_groups()).filter(|&g| g != base).collect();
    let dims = config.score_dimensions();

    let heap = {
        let trees: Vec<KdTree> = others
            .iter()
            .map(|&g| build_tree(pool, g, dims))
            .collect();
        let search = TupleSearch {
            pool: &*pool,
            base,
            trees: &trees,
            radius_scale: config.radius_scale,
            limit: config.max_candidates_per_group,
            caliper: config.effective_caliper(),
        };
        let base_members = pool.unmatched(base);
        info!(
            "n-way: base group '{}' with {} unit(s) against {} group(s)",
            pool.group(base).name(),
            base_members.len(),
            others.len()
        );
        build_tuple_heap(&base_members, config.workers, config.show_progress, |b| {
            search.propose(b)
        })?
    };

    info!("n-way: resolving {} candidate tuple(s)", heap.len());
    Ok(resolve_tuples(pool, heap))
}

/// Commit tuples cheapest first, skipping any with a matched member
pub fn resolve_tuples(pool: &mut CandidatePool, mut heap: BinaryHeap<TupleProposal>) -> Vec<MatchSet> {
    let mut sets = Vec::new();
    while let Some(proposal) = heap.pop() {
        if proposal.members.iter().any(|&m| pool.is_matched(m)) {
            continue;
        }
        for &m in &proposal.members {
            pool.mark_matched(m);
        }
        sets.push(MatchSet::tuple(proposal.members, proposal.distance));
    }
    sets
}

/// Read-only search state shared by every worker
struct TupleSearch<'a> {
    pool: &'a CandidatePool,
    base: usize,
    trees: &'a [KdTree],
    radius_scale: f64,
    limit: usize,
    caliper: f64,
}

impl TupleSearch<'_> {
    fn propose(&self, unit: usize) -> Result<Vec<TupleProposal>> {
        let point = self.pool.get(unit).key.as_slice();
        let tentative: Vec<Neighbor> = self
            .trees
            .iter()
            .map(|tree| tree.require_nearest(point))
            .collect::<Result<_>>()?;

        let mut corners: Vec<&[f64]> = vec![point];
        corners.extend(tentative.iter().map(|n| self.pool.get(n.item).key.as_slice()));
        let farthest = tentative.iter().map(|n| n.distance).fold(0.0, f64::max);
        let radius = (self.radius_scale * spread(&corners)).max(farthest);

        let lists: Vec<Vec<usize>> = self
            .trees
            .iter()
            .zip(&tentative)
            .map(|(tree, nearest)| {
                let found = if self.limit == usize::MAX {
                    tree.nearest_within(point, radius)
                } else {
                    tree.nearest_within_limited(point, radius, self.limit)
                };
                let mut items: Vec<usize> = found
                    .into_iter()
                    .map(|n| n.item)
                    .collect();
                if !items.contains(&nearest.item) {
                    items.insert(0, nearest.item);
                }
                items
            })
            .collect();

        let mut proposals = Vec::new();
        for combo in lists.iter().map(|l| l.iter().copied()).multi_cartesian_product() {
            let members = self.assemble(unit, &combo);
            let scores: Vec<&[f64]> = members
                .iter()
                .map(|&m| self.pool.get(m).scores.as_slice())
                .collect();
            let distance = penalized_distance(&scores);
            if distance <= self.caliper {
                proposals.push(TupleProposal { distance, members });
            }
        }
        Ok(proposals)
    }

    /// Place the base unit among the other groups' picks, in group order
    fn assemble(&self, unit: usize, others: &[usize]) -> Members {
        let mut members = Members::with_capacity(others.len() + 1);
        members.extend(others[..self.base].iter().copied());
        members.push(unit);
        members.extend(others[self.base..].iter().copied());
        members
    }
}
