//! Collapsing 1:1 records into 1:n sets and enforcing the match ratio

use itertools::Itertools;
use log::{debug, warn};

use crate::algorithm::matching::candidate::CandidatePool;
use crate::algorithm::matching::match_set::{MatchSet, Members};

/// Merge sets that share a treatment unit
///
/// Sets are stably sorted by treatment id; each run of equal ids becomes one
/// set holding the treatment unit followed by all of its referents, with the
/// distances summed. Sets without a treatment unit pass through unchanged
/// after the merged ones.
#[must_use]
pub fn collapse_by_treatment(pool: &CandidatePool, sets: Vec<MatchSet>) -> Vec<MatchSet> {
    let (mut paired, rest): (Vec<MatchSet>, Vec<MatchSet>) =
        sets.into_iter().partition(|s| s.treatment.is_some());
    paired.sort_by(|a, b| treatment_id(pool, a).cmp(treatment_id(pool, b)));

    let before = paired.len();
    let mut collapsed: Vec<MatchSet> = paired
        .into_iter()
        .chunk_by(|s| s.treatment)
        .into_iter()
        .map(|(treatment, chunk)| merge(treatment, chunk))
        .collect();
    debug!("Collapsed {before} pair(s) into {} set(s)", collapsed.len());

    collapsed.extend(rest);
    collapsed
}

fn treatment_id<'a>(pool: &'a CandidatePool, set: &MatchSet) -> &'a str {
    set.treatment.map_or("", |t| pool.get(t).id.as_str())
}

fn merge(treatment: Option<usize>, chunk: impl Iterator<Item = MatchSet>) -> MatchSet {
    let mut members = Members::new();
    members.extend(treatment);
    let mut distance = 0.0;
    let mut infos: Vec<String> = Vec::new();

    for set in chunk {
        members.extend(set.referents());
        distance += set.distance;
        if let Some(info) = set.info {
            if !infos.contains(&info) {
                infos.push(info);
            }
        }
    }

    MatchSet {
        members,
        treatment,
        distance,
        info: (!infos.is_empty()).then(|| infos.join("; ")),
    }
}

/// Apply the fixed-ratio rule; variable ratio keeps every set
#[must_use]
pub fn enforce_ratio(sets: Vec<MatchSet>, match_ratio: usize, fixed_ratio: bool) -> Vec<MatchSet> {
    if !fixed_ratio {
        return sets;
    }

    let wanted = match_ratio + 1;
    let total = sets.len();
    let kept: Vec<MatchSet> = sets.into_iter().filter(|s| s.len() == wanted).collect();
    if kept.len() < total {
        warn!(
            "Fixed ratio 1:{match_ratio}: dropped {} of {total} set(s) without exactly {wanted} members",
            total - kept.len()
        );
    }
    kept
}
