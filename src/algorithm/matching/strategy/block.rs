//! Block (complete) matching
//!
//! The unit interval is cut into bins of width equal to the caliper, per
//! score dimension. Every cell holding at least one member of each group
//! becomes one set containing all of its members.

use std::collections::BTreeMap;

use log::debug;
use smallvec::SmallVec;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::group::compare_keys;
use crate::algorithm::matching::match_set::MatchSet;
use crate::config::MatchingConfig;
use crate::error::Result;

/// Absorbs representation error so that e.g. 0.3 / 0.1 lands in bin 3
const BIN_EPSILON: f64 = 1e-9;

type Cell = SmallVec<[usize; 4]>;

/// Integer bin of a score; the last bin is closed so 1.0 is kept
#[must_use]
pub fn bin_index(score: f64, width: f64) -> usize {
    let bins = (1.0 / width).ceil().max(1.0) as usize;
    let raw = (score / width + BIN_EPSILON).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(bins - 1)
    }
}

/// Run block matching
pub fn match_blocks(pool: &mut CandidatePool, config: &MatchingConfig) -> Result<Vec<MatchSet>> {
    let width = config.effective_caliper();
    let num_groups = pool.num_groups();

    let mut cells: BTreeMap<Cell, Vec<usize>> = BTreeMap::new();
    for (idx, candidate) in pool.candidates().iter().enumerate() {
        let cell: Cell = candidate.scores.iter().map(|&s| bin_index(s, width)).collect();
        cells.entry(cell).or_default().push(idx);
    }
    debug!("complete: {} occupied cell(s) at width {width}", cells.len());

    let mut sets = Vec::new();
    for mut members in cells.into_values() {
        let mut present = vec![false; num_groups];
        for &m in &members {
            present[pool.get(m).group_index] = true;
        }
        if !present.iter().all(|&p| p) {
            continue;
        }

        members.sort_by(|&a, &b| {
            let (ca, cb) = (pool.get(a), pool.get(b));
            ca.group_index
                .cmp(&cb.group_index)
                .then_with(|| compare_keys(ca, a, cb, b))
        });

        let distance = cell_spread(pool, &members);
        for &m in &members {
            pool.mark_matched(m);
        }
        sets.push(MatchSet::block(members, distance));
    }
    Ok(sets)
}

/// Sum over dimensions of the score range inside a cell
fn cell_spread(pool: &CandidatePool, members: &[usize]) -> f64 {
    let dims = members.first().map_or(0, |&m| pool.get(m).scores.len());
    (0..dims)
        .map(|axis| {
            let (lo, hi) = members
                .iter()
                .map(|&m| pool.get(m).scores[axis])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s), hi.max(s)));
            hi - lo
        })
        .sum()
}
