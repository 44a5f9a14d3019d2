//! Parallel heap construction for multi-group matching
//!
//! The base group is split into one contiguous slice per worker. Workers run
//! on a dedicated rayon pool, collect their proposals locally and merge them
//! into one shared heap. Because the heap order is total, the merged heap is
//! the same however the base group was split.

use std::collections::BinaryHeap;
use std::sync::{Mutex, PoisonError};

use log::info;
use rayon::prelude::*;

use crate::algorithm::matching::match_set::TupleProposal;
use crate::error::Result;
use crate::utils::logging::progress;

/// Number of workers actually used for a requested count
#[must_use]
pub fn effective_workers(requested: usize) -> usize {
    requested.min(num_cpus::get()).max(1)
}

/// Run `search` for every base unit and merge the proposals into one heap
///
/// The first error raised by any worker aborts the whole build.
pub fn build_tuple_heap<F>(
    base: &[usize],
    workers: usize,
    show_progress: bool,
    search: F,
) -> Result<BinaryHeap<TupleProposal>>
where
    F: Fn(usize) -> Result<Vec<TupleProposal>> + Sync,
{
    let workers = effective_workers(workers);
    let chunk_size = base.len().div_ceil(workers).max(1);
    info!(
        "Building tuple heap for {} base unit(s) on {workers} worker(s)",
        base.len()
    );

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    let heap = Mutex::new(BinaryHeap::new());
    let pb = progress::create_run_progress_bar(
        show_progress,
        base.len() as u64,
        "Building match tuples",
    );

    thread_pool.install(|| {
        base.par_chunks(chunk_size).try_for_each(|slice| -> Result<()> {
            let mut local = Vec::new();
            for &unit in slice {
                local.extend(search(unit)?);
                pb.inc(1);
            }
            heap.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(local);
            Ok(())
        })
    })?;

    progress::finish_progress_bar(&pb, Some("Tuple heap built"));
    Ok(heap.into_inner().unwrap_or_else(PoisonError::into_inner))
}
