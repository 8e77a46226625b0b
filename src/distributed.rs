use std::panic;
use std::thread;
use std::time::Instant;

use crate::comm::{self, Comm, Payload, ReduceOp};
use crate::config::Domain;
use crate::error::GapError;
use crate::partition::Partition;
use crate::reduce::TieBreak;
use crate::report::GapReport;
use crate::scan::{RegionBounds, scan_primes};
use crate::sieve::{BaseRegion, RegionAllocator, Segment};
use crate::tracker::{GapRecord, GapTracker};

/// Message-passing run: `ranks` workers that share nothing and talk only
/// through `Comm`.
///
/// Returns every rank's outcome in rank order. Each rank sieves its own copy
/// of the base region, then its range. Seam gaps travel leftward between
/// neighbours and the top-K merge runs as a collective, so every rank ends up
/// holding the same final list.
pub fn run(
    domain: Domain,
    ranks: usize,
    tie_break: TieBreak,
    allocator: &dyn RegionAllocator,
) -> Result<Vec<Result<GapReport, GapError>>, GapError> {
    let partition = Partition::new(domain, ranks)?;
    let partition = &partition;

    let outcomes = thread::scope(|scope| {
        let handles: Vec<_> = comm::universe(ranks)
            .into_iter()
            .map(|comm| scope.spawn(move || rank_main(comm, partition, tie_break, allocator)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });

    Ok(outcomes)
}

fn rank_main(
    mut comm: Comm,
    partition: &Partition,
    tie_break: TieBreak,
    allocator: &dyn RegionAllocator,
) -> Result<GapReport, GapError> {
    let rank = comm.rank();
    let domain = partition.domain();
    let range = partition.range(rank);

    let base = BaseRegion::try_new(rank, domain.base_end());
    let flags = allocator.allocate(rank, range.len());

    // Every rank learns whether anyone failed before anyone starts sieving.
    let failure = base.as_ref().err().or(flags.as_ref().err()).cloned();
    if let Some(err) = &failure {
        tracing::error!("rank {}: {}", rank, err);
    }
    let any_failed = comm.all_reduce(u64::from(failure.is_some()), ReduceOp::Or)?;
    if any_failed != 0 {
        return Err(failure.unwrap_or(GapError::PeerAllocationFailure));
    }
    let (base, mut flags) = (base?, flags?);

    comm.barrier()?;
    let start = Instant::now();

    base.sieve();
    let base_primes: Vec<usize> = base.primes().collect();
    let mut segment = Segment::new(range.start, &mut flags);
    segment.sieve(&base_primes);

    let mut scan = if rank == 0 {
        scan_primes(base.primes().chain(segment.primes()))
    } else {
        scan_primes(segment.primes())
    };
    tracing::debug!(
        "rank {} scanned [{}, {}): {} primes",
        rank,
        range.start,
        range.end,
        scan.primes
    );

    let right_first = seam_exchange(&mut comm, scan.bounds)?;
    if let (Some(last), Some(next)) = (scan.bounds.last, right_first) {
        let gap = GapRecord::new(last, next);
        tracing::debug!("rank {} owns seam gap {} -> {}", rank, last, next);
        scan.tracker.insert_record(gap);
    }

    let gaps = merge_top_k(&mut comm, &scan.tracker, tie_break)?;
    let elapsed = start.elapsed();
    if rank == 0 {
        tracing::info!("{} ranks finished in {:?}", comm.size(), elapsed);
    }

    Ok(GapReport { gaps, elapsed })
}

/// First prime of the nearest non-empty range to the right, if any.
///
/// Each round every rank passes a prime one step left. A rank with primes of
/// its own always passes its first one; an empty rank relays whatever it last
/// got from the right. Rounds repeat until no relay changed anywhere, which
/// takes one round plus one per run of consecutive empty ranks.
fn seam_exchange(comm: &mut Comm, bounds: RegionBounds) -> Result<Option<usize>, GapError> {
    let mut outgoing = bounds.first;
    let mut rounds = 0;

    loop {
        rounds += 1;
        let incoming = match comm.exchange_leftward(Payload::Prime(outgoing))? {
            None => None,
            Some(Payload::Prime(prime)) => prime,
            Some(_) => {
                return Err(GapError::UnexpectedMessage {
                    rank: comm.rank() + 1,
                });
            }
        };

        let mut changed = false;
        if bounds.is_empty() && incoming != outgoing {
            outgoing = incoming;
            changed = true;
        }

        if comm.all_reduce(u64::from(changed), ReduceOp::Or)? == 0 {
            if rounds > 1 {
                tracing::debug!("rank {}: seams settled after {} rounds", comm.rank(), rounds);
            }
            return Ok(incoming);
        }
    }
}

/// Distributed top-K: K rounds of "largest head wins".
///
/// Each round the ranks agree on the largest remaining head distance, then
/// elect one holder of it by `tie_break`. The owner pops its head and
/// broadcasts it; everyone appends it to the result. Stops early once no rank
/// has anything left.
pub fn merge_top_k<const K: usize>(
    comm: &mut Comm,
    local: &GapTracker<K>,
    tie_break: TieBreak,
) -> Result<GapTracker<K>, GapError> {
    let rank = comm.rank();
    let mut remaining = local.clone();
    let mut merged = GapTracker::new();

    for _ in 0..K {
        // Distances are at least 1, so 0 means "nothing left here".
        let head = remaining.largest().map_or(0, |r| r.distance as u64);
        let max = comm.all_reduce(head, ReduceOp::Max)?;
        if max == 0 {
            break;
        }

        let vote = tie_break.vote(rank, head == max);
        let owner = comm.all_reduce(vote, tie_break.op())? as usize;

        let mine = if owner == rank {
            remaining.remove_largest().map(Payload::Record)
        } else {
            None
        };

        match comm.broadcast(owner, mine)? {
            Payload::Record(record) => {
                merged.insert_record(record);
            }
            _ => return Err(GapError::UnexpectedMessage { rank: owner }),
        }
    }

    Ok(merged)
}
