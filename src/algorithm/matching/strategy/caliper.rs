//! Caliper greedy matching
//!
//! Treatment units are visited in seeded random order. Each one takes the
//! closer of its two neighbouring referents if that referent is inside the
//! caliper. Nothing is ever revisited.

use log::debug;
use rand::rngs::StdRng;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::index::{OrderedIndex, ScoreKey};
use crate::algorithm::matching::match_set::MatchSet;
use crate::algorithm::matching::strategy::{REFERENT, TREATMENT};
use crate::config::MatchingConfig;
use crate::error::Result;

/// Run caliper greedy matching
///
/// With a match ratio above one the sweep repeats, each time over the units
/// that took a referent in every earlier sweep.
pub fn match_caliper(pool: &mut CandidatePool, config: &MatchingConfig, rng: &mut StdRng) -> Result<Vec<MatchSet>> {
    let caliper = config.effective_caliper();
    let name = config.algorithm.name();
    let mut referents = OrderedIndex::from_scores(
        pool.unmatched(REFERENT)
            .into_iter()
            .map(|r| (r, pool.get(r).key1())),
    );

    let mut sets = Vec::new();
    for round in 0..config.match_ratio {
        let order = pool
            .group(TREATMENT)
            .shuffled(rng, |&t| pool.get(t).balance.total == round);
        if order.is_empty() {
            break;
        }

        let before = sets.len();
        for t in order {
            let key = pool.get(t).key1();
            let closest = [referents.below(key), referents.above(key)]
                .into_iter()
                .flatten()
                .map(|k: ScoreKey| (k, pool.distance(t, k.item)))
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.item.cmp(&b.0.item)));

            let Some((found, distance)) = closest else {
                continue;
            };
            if distance > caliper {
                continue;
            }

            let side = pool.side_of(t, found.item);
            pool.mark_matched(found.item);
            pool.record_match(t, side);
            referents.remove(found.item, found.score);
            sets.push(MatchSet::pair(t, found.item, distance, name));
        }
        debug!("{name}: round {} matched {} unit(s)", round + 1, sets.len() - before);
    }
    Ok(sets)
}
