//! Two-group nearest-neighbor matching, plain and balanced
//!
//! Every treatment unit proposes its nearest referents on both sides into a
//! global min-heap. Popping a proposal whose members are both still
//! available commits it; a proposal that lost one member is replaced by the
//! surviving member's next-nearest partner. Referents are walked outward
//! through a [`GroupOrder`], so a replacement never re-scans referents a
//! treatment unit has already proposed.
//!
//! Parallel mode runs one pass in which each treatment unit may take up to
//! `match_ratio` referents. Sequential mode runs one pass per ratio level,
//! each giving every unit at most one more referent.

use std::collections::BinaryHeap;

use log::debug;
use rustc_hash::FxHashMap;

use crate::algorithm::matching::candidate::{CandidatePool, Side};
use crate::algorithm::matching::group::GroupOrder;
use crate::algorithm::matching::index::{OrderedIndex, SpatialIndex};
use crate::algorithm::matching::match_set::{MatchSet, PairProposal};
use crate::algorithm::matching::strategy::{REFERENT, TREATMENT};
use crate::config::MatchingConfig;
use crate::error::Result;

/// Run nearest-neighbor matching; `balanced` keeps left/right counts even
pub fn match_nearest(pool: &mut CandidatePool, config: &MatchingConfig, balanced: bool) -> Result<Vec<MatchSet>> {
    let caliper = config.effective_caliper();
    let ratio = config.match_ratio;
    let name = config.algorithm.name();

    if config.use_parallel {
        let sets = NearestPass::new(pool, caliper, ratio, ratio, balanced, name.to_string()).run();
        debug!("{name}: {} pair(s) in a single pass", sets.len());
        return Ok(sets);
    }

    let mut sets = Vec::new();
    for pass in 1..=ratio {
        let info = if ratio > 1 {
            format!("{name}, pass {pass} of {ratio}")
        } else {
            name.to_string()
        };
        let committed = NearestPass::new(pool, caliper, ratio, 1, balanced, info).run();
        debug!("{name}: pass {pass} of {ratio} committed {} pair(s)", committed.len());
        if committed.is_empty() {
            break;
        }
        sets.extend(committed);
    }
    Ok(sets)
}

const fn slot(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

/// Per-treatment progress through the referent order
#[derive(Debug, Clone, Copy, Default)]
struct Walk {
    used: usize,
    frontier: [Option<usize>; 2],
    exhausted: [bool; 2],
}

struct NearestPass<'a> {
    pool: &'a mut CandidatePool,
    caliper: f64,
    capacity: usize,
    balanced: bool,
    info: String,
    order: Vec<usize>,
    referents: OrderedIndex,
    referent_order: GroupOrder,
    treatments: OrderedIndex,
    walks: FxHashMap<usize, Walk>,
    reserved: FxHashMap<usize, Vec<PairProposal>>,
    heap: BinaryHeap<PairProposal>,
    sets: Vec<MatchSet>,
}

impl<'a> NearestPass<'a> {
    /// Index the treatment units below `ratio` matches and the unmatched referents
    fn new(
        pool: &'a mut CandidatePool,
        caliper: f64,
        ratio: usize,
        capacity: usize,
        balanced: bool,
        info: String,
    ) -> Self {
        let order: Vec<usize> = pool
            .group(TREATMENT)
            .members()
            .iter()
            .copied()
            .filter(|&t| pool.get(t).balance.total < ratio)
            .collect();
        let unmatched = pool.unmatched(REFERENT);

        let referents = OrderedIndex::from_scores(unmatched.iter().map(|&r| (r, pool.get(r).key1())));
        let treatments = OrderedIndex::from_scores(order.iter().map(|&t| (t, pool.get(t).key1())));
        let walks = order.iter().map(|&t| (t, Walk::default())).collect();

        Self {
            pool,
            caliper,
            capacity,
            balanced,
            info,
            order,
            referents,
            referent_order: GroupOrder::new(unmatched),
            treatments,
            walks,
            reserved: FxHashMap::default(),
            heap: BinaryHeap::new(),
            sets: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<MatchSet> {
        self.seed();

        while let Some(proposal) = self.heap.pop() {
            let treatment_free = self.is_available(proposal.treatment);
            let referent_free = !self.pool.is_matched(proposal.referent);

            let replacement = match (treatment_free, referent_free) {
                (true, true) => {
                    self.try_commit(proposal);
                    None
                }
                (true, false) => self.next_for_treatment(proposal.treatment),
                (false, true) => self.next_for_referent(proposal.referent),
                (false, false) => None,
            };
            if let Some(next) = replacement {
                self.heap.push(next);
            }
        }

        self.sets
    }

    fn seed(&mut self) {
        for i in 0..self.order.len() {
            let t = self.order[i];
            for side in [Side::Left, Side::Right] {
                for _ in 0..self.capacity {
                    match self.advance(t, side) {
                        Some(proposal) => self.heap.push(proposal),
                        None => break,
                    }
                }
            }
        }
    }

    fn is_available(&self, treatment: usize) -> bool {
        self.walks
            .get(&treatment)
            .is_some_and(|w| w.used < self.capacity)
    }

    /// Next referent on `side` beyond the frontier, if within the caliper
    fn peek(&mut self, treatment: usize, side: Side) -> Option<(usize, f64)> {
        let s = slot(side);
        let walk = *self.walks.get(&treatment)?;
        if walk.exhausted[s] {
            return None;
        }

        let key = self.pool.get(treatment).key1();
        let next = match (walk.frontier[s], side) {
            (Some(last), Side::Left) => self.referent_order.live_before(last),
            (Some(last), Side::Right) => self.referent_order.live_after(last),
            (None, Side::Left) => self.referents.below(key).map(|k| k.item),
            (None, Side::Right) => self.referents.at_or_above(key).map(|k| k.item),
        };

        let found = next
            .map(|r| (r, self.pool.distance(treatment, r)))
            .filter(|&(_, d)| d <= self.caliper);
        if found.is_none() {
            if let Some(w) = self.walks.get_mut(&treatment) {
                w.exhausted[s] = true;
            }
        }
        found
    }

    fn advance(&mut self, treatment: usize, side: Side) -> Option<PairProposal> {
        let (referent, distance) = self.peek(treatment, side)?;
        if let Some(w) = self.walks.get_mut(&treatment) {
            w.frontier[slot(side)] = Some(referent);
        }
        Some(PairProposal {
            distance,
            treatment,
            referent,
        })
    }

    /// Closest unproposed referent on either side
    fn next_for_treatment(&mut self, treatment: usize) -> Option<PairProposal> {
        let left = self.peek(treatment, Side::Left);
        let right = self.peek(treatment, Side::Right);
        let side = match (left, right) {
            (Some((l, dl)), Some((r, dr))) => {
                if dl.total_cmp(&dr).then(l.cmp(&r)).is_le() {
                    Side::Left
                } else {
                    Side::Right
                }
            }
            (Some(_), None) => Side::Left,
            (None, Some(_)) => Side::Right,
            (None, None) => return None,
        };
        self.advance(treatment, side)
    }

    /// Nearest treatment unit that can still take a referent
    fn next_for_referent(&self, referent: usize) -> Option<PairProposal> {
        let key = self.pool.get(referent).key1();
        let nearest = self.treatments.nearest(&[key])?;
        let distance = self.pool.distance(nearest.item, referent);
        (distance <= self.caliper).then_some(PairProposal {
            distance,
            treatment: nearest.item,
            referent,
        })
    }

    fn try_commit(&mut self, proposal: PairProposal) {
        let PairProposal {
            distance,
            treatment,
            referent,
        } = proposal;
        let side = self.pool.side_of(treatment, referent);

        if self.balanced && !self.pool.get(treatment).balance.with(side).is_balanced() {
            self.reserved.entry(treatment).or_default().push(proposal);
            if let Some(next) = self.advance(treatment, side.opposite()) {
                self.heap.push(next);
            }
            return;
        }

        self.pool.mark_matched(referent);
        self.pool.record_match(treatment, side);
        let referent_key = self.pool.get(referent).key1();
        self.referents.remove(referent, referent_key);
        self.referent_order.unlink(referent);

        let used = self.walks.get_mut(&treatment).map_or(self.capacity, |w| {
            w.used += 1;
            w.used
        });
        if used >= self.capacity {
            let treatment_key = self.pool.get(treatment).key1();
            self.treatments.remove(treatment, treatment_key);
            self.reserved.remove(&treatment);
        } else if let Some(released) = self.reserved.remove(&treatment) {
            self.heap.extend(released);
        }

        self.sets
            .push(MatchSet::pair(treatment, referent, distance, self.info.clone()));
    }
}
