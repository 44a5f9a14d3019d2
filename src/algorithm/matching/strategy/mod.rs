//! Matching strategies
//!
//! Each [`Algorithm`] variant maps to one function with the same shape: it
//! takes the candidate pool, the frozen configuration and the run's random
//! generator, marks candidates matched as it commits, and returns the
//! committed sets in commit order.

pub mod block;
pub mod caliper;
pub mod digit;
pub mod nearest;
pub mod nway;
pub mod three_way;

use rand::rngs::StdRng;

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::match_set::MatchSet;
use crate::config::{Algorithm, MatchingConfig};
use crate::error::Result;

/// Pool group index of the treatment group in two-group runs
pub const TREATMENT: usize = 0;

/// Pool group index of the referent group in two-group runs
pub const REFERENT: usize = 1;

/// Run the configured algorithm over the pool
pub fn run(pool: &mut CandidatePool, config: &MatchingConfig, rng: &mut StdRng) -> Result<Vec<MatchSet>> {
    match config.algorithm {
        Algorithm::NearestNeighbor => nearest::match_nearest(pool, config, false),
        Algorithm::BalancedNearestNeighbor => nearest::match_nearest(pool, config, true),
        Algorithm::DigitGreedy => digit::match_digits(pool, config, rng),
        Algorithm::CaliperGreedy => caliper::match_caliper(pool, config, rng),
        Algorithm::Complete => block::match_blocks(pool, config),
        Algorithm::NWay => nway::match_n_way(pool, config),
        Algorithm::ThreeWay => three_way::match_three_way(pool, config),
    }
}
