use crate::scan::RegionBounds;
use crate::tracker::{GapRecord, GapTracker};

/// Gaps that cross the seam between neighbouring workers' ranges.
///
/// `bounds` is indexed by worker and ordered numerically. Each gap runs from
/// the last prime of a non-empty range to the first prime of the next
/// non-empty range, skipping ranges that held no primes. The gap belongs to
/// the lower worker. Every seam yields exactly one gap.
pub fn boundary_gaps(bounds: &[RegionBounds]) -> Vec<(usize, GapRecord)> {
    let mut gaps = Vec::new();
    let mut prev: Option<(usize, usize)> = None;

    for (worker, region) in bounds.iter().enumerate() {
        let (Some(first), Some(last)) = (region.first, region.last) else {
            continue;
        };

        if let Some((owner, prev_last)) = prev {
            gaps.push((owner, GapRecord::new(prev_last, first)));
        }
        prev = Some((worker, last));
    }

    gaps
}

/// Fold every boundary gap into the tracker of the worker that owns it.
pub fn stitch<const K: usize>(bounds: &[RegionBounds], trackers: &mut [GapTracker<K>]) {
    debug_assert_eq!(bounds.len(), trackers.len());

    for (owner, gap) in boundary_gaps(bounds) {
        tracing::debug!(
            "seam gap {} -> {} ({}) owned by worker {}",
            gap.small,
            gap.large,
            gap.distance,
            owner
        );
        trackers[owner].insert_record(gap);
    }
}
