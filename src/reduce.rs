use crate::comm::ReduceOp;
use crate::tracker::{GapRecord, GapTracker};

/// Which worker wins when several hold the round's maximum distance.
///
/// Workers cover the domain in numeric order, so `LowestRank` keeps the gap
/// found first, the same answer a single unpartitioned scan gives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    #[default]
    LowestRank,
    HighestRank,
}

impl TieBreak {
    pub fn select<I>(self, holders: I) -> Option<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let holders = holders.into_iter();
        match self {
            TieBreak::LowestRank => holders.min(),
            TieBreak::HighestRank => holders.max(),
        }
    }

    /// Collective operation that elects the owner from every rank's vote.
    pub fn op(self) -> ReduceOp {
        match self {
            TieBreak::LowestRank => ReduceOp::Min,
            TieBreak::HighestRank => ReduceOp::Max,
        }
    }

    /// A rank's contribution to the owner election. Ranks that do not hold
    /// the maximum vote with the identity of `op` so they can never win.
    pub fn vote(self, rank: usize, holds_max: bool) -> u64 {
        match (self, holds_max) {
            (_, true) => rank as u64,
            (TieBreak::LowestRank, false) => u64::MAX,
            (TieBreak::HighestRank, false) => 0,
        }
    }
}

/// Merge per-worker trackers into a fresh one holding the K largest gaps.
///
/// Runs the same K rounds as the message-passing merge: find the largest
/// remaining head, elect its owner, take that record and advance the owner.
/// The inputs are only read.
pub fn merge<const K: usize>(trackers: &[GapTracker<K>], tie_break: TieBreak) -> GapTracker<K> {
    let mut cursors = vec![0usize; trackers.len()];
    let mut merged = GapTracker::new();

    let head = |cursors: &[usize], worker: usize| -> Option<GapRecord> {
        trackers[worker].records().get(cursors[worker]).copied()
    };

    for round in 0..K {
        let max = (0..trackers.len())
            .filter_map(|w| head(&cursors, w))
            .map(|r| r.distance)
            .max();
        let Some(max) = max else {
            tracing::debug!("all workers exhausted after {} round(s)", round);
            break;
        };

        let holders = (0..trackers.len())
            .filter(|&w| head(&cursors, w).is_some_and(|r| r.distance == max));
        let Some(owner) = tie_break.select(holders) else {
            break;
        };

        if let Some(record) = head(&cursors, owner) {
            merged.insert_record(record);
            cursors[owner] += 1;
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{RegionBounds, scan_primes};
    use crate::stitch::stitch;
    use crate::tracker::TopFive;
    use proptest::prelude::*;

    fn tracker(records: &[(usize, usize)]) -> TopFive {
        let mut t = TopFive::new();
        for &(small, large) in records {
            t.insert(large - small, small, large);
        }
        t
    }

    #[test]
    fn test_merge_interleaves_workers() {
        let a = tracker(&[(2, 10), (20, 24), (30, 32)]);
        let b = tracker(&[(40, 47), (50, 53)]);
        let merged = merge(&[a, b], TieBreak::LowestRank);
        let distances: Vec<usize> = merged.iter().map(|r| r.distance).collect();
        assert_eq!(distances, vec![8, 7, 4, 3, 2]);
    }

    #[test]
    fn test_tie_break_rule() {
        let a = tracker(&[(2, 8)]);
        let b = tracker(&[(100, 106)]);

        let low = merge(&[a.clone(), b.clone()], TieBreak::LowestRank);
        assert_eq!(low.records()[0].small, 2);

        let high = merge(&[a, b], TieBreak::HighestRank);
        assert_eq!(high.records()[0].small, 100);
        assert_eq!(high.records()[1].small, 2);
    }

    #[test]
    fn test_merge_with_fewer_than_k_gaps() {
        let merged = merge(&[tracker(&[(3, 5)]), TopFive::new()], TieBreak::LowestRank);
        assert_eq!(merged.len(), 1);
        let empty = merge::<5>(&[], TieBreak::LowestRank);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_inputs_untouched() {
        let inputs = vec![tracker(&[(2, 10), (11, 13)]), tracker(&[(13, 17)])];
        let before = inputs.clone();
        let _ = merge(&inputs, TieBreak::LowestRank);
        assert_eq!(inputs, before);
    }

    #[test]
    fn test_votes_never_elect_non_holders() {
        for tie_break in [TieBreak::LowestRank, TieBreak::HighestRank] {
            let votes = [
                tie_break.vote(0, false),
                tie_break.vote(1, true),
                tie_break.vote(2, false),
                tie_break.vote(3, true),
            ];
            let elected = tie_break.op().apply(&votes);
            let expected = tie_break.select([1, 3]).unwrap() as u64;
            assert_eq!(elected, expected);
        }
    }

    /// Lay the workers' gaps out one after another, as a real partition does,
    /// so "first found" is well defined.
    fn layout(per_worker: &[Vec<usize>]) -> Vec<Vec<usize>> {
        let mut next = 2;
        per_worker
            .iter()
            .map(|gaps| {
                let mut primes = vec![next];
                for &g in gaps {
                    next += g;
                    primes.push(next);
                }
                // seam gap to the next worker
                next += 2;
                primes
            })
            .collect()
    }

    proptest! {
        #[test]
        fn test_merge_matches_full_sort(
            per_worker in proptest::collection::vec(
                proptest::collection::vec(1usize..5, 0..12),
                2..9,
            )
        ) {
            let ranges = layout(&per_worker);
            let scans: Vec<_> = ranges.iter().map(|r| scan_primes(r.iter().copied())).collect();
            let bounds: Vec<RegionBounds> = scans.iter().map(|s| s.bounds).collect();
            let mut trackers: Vec<TopFive> = scans.into_iter().map(|s| s.tracker).collect();
            stitch(&bounds, &mut trackers);

            let merged = merge(&trackers, TieBreak::LowestRank);

            let all_primes: Vec<usize> = ranges.concat();
            let mut expected: Vec<GapRecord> = all_primes
                .windows(2)
                .map(|w| GapRecord::new(w[0], w[1]))
                .collect();
            expected.sort_by(|a, b| b.distance.cmp(&a.distance));
            expected.truncate(5);

            prop_assert_eq!(merged.records(), &expected[..]);
        }
    }
}
