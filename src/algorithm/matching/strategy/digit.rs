//! Digit-coarsened greedy matching
//!
//! Scores are rounded to `start_digit` decimals first. Referents whose rounded
//! score equals a treatment unit's rounded score are matched immediately;
//! whatever is left moves on to the next, coarser precision, down to
//! `end_digit`.

use std::collections::BTreeMap;

use log::debug;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::distance::round_to_digits;
use crate::algorithm::matching::match_set::MatchSet;
use crate::algorithm::matching::strategy::{REFERENT, TREATMENT};
use crate::config::MatchingConfig;
use crate::error::Result;

/// Run digit-greedy matching
pub fn match_digits(pool: &mut CandidatePool, config: &MatchingConfig, rng: &mut StdRng) -> Result<Vec<MatchSet>> {
    let ratio = config.match_ratio;
    let (sweeps, capacity) = if config.use_parallel { (1, ratio) } else { (ratio, 1) };

    let mut sets = Vec::new();
    for sweep in 1..=sweeps {
        let before = sets.len();
        run_sweep(pool, config, rng, capacity, sweep, sweeps, &mut sets);
        debug!(
            "digit-greedy: sweep {sweep} of {sweeps} committed {} pair(s)",
            sets.len() - before
        );
        if sets.len() == before {
            break;
        }
    }
    Ok(sets)
}

fn run_sweep(
    pool: &mut CandidatePool,
    config: &MatchingConfig,
    rng: &mut StdRng,
    capacity: usize,
    sweep: usize,
    sweeps: usize,
    sets: &mut Vec<MatchSet>,
) {
    let caliper = config.effective_caliper();
    let mut used: FxHashMap<usize, usize> = pool
        .group(TREATMENT)
        .members()
        .iter()
        .filter(|&&t| pool.get(t).balance.total < config.match_ratio)
        .map(|&t| (t, 0))
        .collect();

    for digits in (config.end_digit..=config.start_digit).rev() {
        let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for &t in pool.group(TREATMENT).members() {
            if used.get(&t).is_some_and(|&n| n < capacity) {
                buckets
                    .entry(round_to_digits(pool.get(t).score(), digits))
                    .or_default()
                    .push(t);
            }
        }
        if buckets.is_empty() {
            break;
        }

        let referents = pool
            .group(REFERENT)
            .shuffled(rng, |&r| !pool.is_matched(r));

        let info = if sweeps > 1 {
            format!("digit-greedy, {digits} digit(s), sweep {sweep} of {sweeps}")
        } else {
            format!("digit-greedy, {digits} digit(s)")
        };

        let mut committed = 0;
        for r in referents {
            let rounded = round_to_digits(pool.get(r).score(), digits);
            let Some(bucket) = buckets.get_mut(&rounded) else {
                continue;
            };

            let best = bucket
                .iter()
                .enumerate()
                .map(|(pos, &t)| (pos, t, pool.distance(t, r)))
                .filter(|&(_, _, d)| d <= caliper)
                .min_by(|a, b| {
                    a.2.total_cmp(&b.2)
                        .then(pool.get(a.1).key1().total_cmp(&pool.get(b.1).key1()))
                        .then(a.1.cmp(&b.1))
                });
            let Some((pos, t, distance)) = best else {
                continue;
            };

            let side = pool.side_of(t, r);
            pool.mark_matched(r);
            pool.record_match(t, side);
            committed += 1;

            let count = used.entry(t).or_default();
            *count += 1;
            if *count >= capacity {
                bucket.swap_remove(pos);
            }
            sets.push(MatchSet::pair(t, r, distance, info.clone()));
        }
        debug!("digit-greedy: {digits} digit(s) committed {committed} pair(s)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::candidate::SubjectRecord;
    use crate::config::Algorithm;
    use rand::{Rng, SeedableRng};
    use rustc_hash::FxHashSet;

    fn build_pool(treatments: &[f64], referents: &[f64], rng: &mut StdRng) -> CandidatePool {
        let records = treatments
            .iter()
            .enumerate()
            .map(|(i, s)| SubjectRecord::new(format!("t{i}"), "1", vec![*s]))
            .chain(
                referents
                    .iter()
                    .enumerate()
                    .map(|(i, s)| SubjectRecord::new(format!("r{i}"), "0", vec![*s])),
            )
            .collect();
        CandidatePool::new(records, &["1".to_string(), "0".to_string()], rng).unwrap()
    }

    fn config() -> MatchingConfig {
        MatchingConfig::builder()
            .algorithm(Algorithm::DigitGreedy)
            .digits(3, 1)
            .build()
    }

    #[test]
    fn test_finest_digit_wins_first() {
        let mut rng = StdRng::seed_from_u64(9);
        // r0 agrees with t0 to 3 digits; r1 only to 1 digit
        let mut pool = build_pool(&[0.4321], &[0.4324, 0.4100], &mut rng);
        let sets = match_digits(&mut pool, &config(), &mut rng).unwrap();

        assert_eq!(sets.len(), 1);
        assert_eq!(pool.get(sets[0].members[1]).id, "r0");
        assert_eq!(sets[0].info.as_deref(), Some("digit-greedy, 3 digit(s)"));
    }

    #[test]
    fn test_unmatched_referents_carry_to_coarser_digits() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pool = build_pool(&[0.4321, 0.71], &[0.4324, 0.7399], &mut rng);
        let sets = match_digits(&mut pool, &config(), &mut rng).unwrap();

        assert_eq!(sets.len(), 2);
        let coarse = sets
            .iter()
            .find(|s| pool.get(s.members[0]).id == "t1")
            .unwrap();
        assert_eq!(coarse.info.as_deref(), Some("digit-greedy, 1 digit(s)"));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let mut data_rng = StdRng::seed_from_u64(123);
        let treatments: Vec<f64> = (0..80).map(|_| data_rng.random::<f64>()).collect();
        let referents: Vec<f64> = (0..240).map(|_| data_rng.random::<f64>()).collect();
        let config = MatchingConfig::builder()
            .algorithm(Algorithm::DigitGreedy)
            .match_ratio(2)
            .use_parallel(false)
            .build();

        let run = || {
            let mut rng = StdRng::seed_from_u64(config.seed());
            let mut pool = build_pool(&treatments, &referents, &mut rng);
            let sets = match_digits(&mut pool, &config, &mut rng).unwrap();
            sets.iter()
                .map(|s| (pool.get(s.members[0]).id.clone(), pool.get(s.members[1]).id.clone()))
                .collect::<Vec<_>>()
        };

        let first = run();
        assert!(!first.is_empty());
        assert_eq!(first, run());

        let referents: FxHashSet<&String> = first.iter().map(|(_, r)| r).collect();
        assert_eq!(referents.len(), first.len());
    }
}
