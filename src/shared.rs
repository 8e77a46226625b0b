use std::mem;
use std::panic;
use std::sync::{Barrier, OnceLock};
use std::thread;
use std::time::Instant;

use crate::config::Domain;
use crate::error::GapError;
use crate::partition::Partition;
use crate::reduce::{TieBreak, merge};
use crate::report::GapReport;
use crate::scan::{LocalScan, RegionBounds, scan_primes};
use crate::sieve::{BaseRegion, Segment, allocate_flags};
use crate::stitch::stitch;
use crate::tracker::TopFive;

/// Shared-memory run: `workers` threads in one address space.
///
/// The base region is shared and sieved cooperatively (striped, with
/// overlapping idempotent writes). The extension range is one allocation cut
/// into disjoint `&mut` slices, one per worker. After every worker has
/// scanned, the caller stitches the seams and merges the trackers.
pub fn run(domain: Domain, workers: usize, tie_break: TieBreak) -> Result<GapReport, GapError> {
    let partition = Partition::new(domain, workers)?;

    let base = BaseRegion::try_new(0, domain.base_end())?;
    let mut extension = allocate_flags(0, domain.extension_len())?;
    let segments = split_segments(&mut extension, &partition);

    let barrier = Barrier::new(workers);
    let started = OnceLock::new();

    let scans: Vec<LocalScan> = thread::scope(|scope| {
        let handles: Vec<_> = segments
            .into_iter()
            .enumerate()
            .map(|(worker, mut segment)| {
                let base = &base;
                let barrier = &barrier;
                let started = &started;
                scope.spawn(move || {
                    // Clock starts once every worker is up
                    if barrier.wait().is_leader() {
                        let _ = started.set(Instant::now());
                    }

                    base.sieve_stripe(worker, workers);
                    // Base region is read-only from here on
                    barrier.wait();

                    let base_primes: Vec<usize> = base.primes().collect();
                    segment.sieve(&base_primes);

                    let scan = if worker == 0 {
                        scan_primes(base.primes().chain(segment.primes()))
                    } else {
                        scan_primes(segment.primes())
                    };
                    tracing::debug!(
                        "worker {} scanned [{}, {}): {} primes, bounds {:?}",
                        worker,
                        segment.start(),
                        segment.end(),
                        scan.primes,
                        scan.bounds
                    );
                    scan
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });

    let bounds: Vec<RegionBounds> = scans.iter().map(|s| s.bounds).collect();
    let mut trackers: Vec<TopFive> = scans.into_iter().map(|s| s.tracker).collect();
    stitch(&bounds, &mut trackers);
    let gaps = merge(&trackers, tie_break);

    let elapsed = started.get().map(Instant::elapsed).unwrap_or_default();
    tracing::info!("{} workers finished in {:?}", workers, elapsed);

    Ok(GapReport { gaps, elapsed })
}

/// Cut the extension flags into one segment per partition range.
fn split_segments<'a>(extension: &'a mut [u8], partition: &Partition) -> Vec<Segment<'a>> {
    let mut rest = extension;
    let mut segments = Vec::with_capacity(partition.workers());

    for range in partition.ranges() {
        let (head, tail) = mem::take(&mut rest).split_at_mut(range.len());
        segments.push(Segment::new(range.start, head));
        rest = tail;
    }

    segments
}
