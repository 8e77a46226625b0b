use crate::tracker::TopFive;

/// First and last prime a worker saw in its own range. `None` means the range
/// held no primes at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionBounds {
    pub first: Option<usize>,
    pub last: Option<usize>,
}

impl RegionBounds {
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

/// What one worker learned from walking its range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalScan {
    pub tracker: TopFive,
    pub bounds: RegionBounds,
    pub primes: usize,
}

/// Walk `primes` (ascending) and track the largest gaps between neighbours.
///
/// The first prime of a range gets no gap. For worker 0 that prime is 2, the
/// start of the domain. For every other worker its predecessor lives in the
/// previous worker's range, so the gap is left to the stitcher.
pub fn scan_primes<I>(primes: I) -> LocalScan
where
    I: IntoIterator<Item = usize>,
{
    let mut scan = LocalScan::default();
    let mut last_prime: Option<usize> = None;

    for prime in primes {
        match last_prime {
            Some(prev) => {
                scan.tracker.insert(prime - prev, prev, prime);
            }
            None => {
                scan.bounds.first = Some(prime);
            }
        }

        last_prime = Some(prime);
        scan.primes += 1;
    }

    scan.bounds.last = last_prime;
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::GapRecord;

    #[test]
    fn test_scan_from_domain_start() {
        let scan = scan_primes([2, 3, 5, 7, 11, 13]);
        assert_eq!(scan.primes, 6);
        assert_eq!(scan.bounds.first, Some(2));
        assert_eq!(scan.bounds.last, Some(13));
        let largest = scan.tracker.largest().copied();
        assert_eq!(largest, Some(GapRecord::new(7, 11)));
        assert_eq!(scan.tracker.len(), 5);
    }

    #[test]
    fn test_first_prime_has_no_gap() {
        let scan = scan_primes([101, 103, 107]);
        assert_eq!(scan.bounds.first, Some(101));
        assert_eq!(scan.bounds.last, Some(107));
        let records: Vec<GapRecord> = scan.tracker.iter().copied().collect();
        assert_eq!(records, vec![GapRecord::new(103, 107), GapRecord::new(101, 103)]);
    }

    #[test]
    fn test_empty_region() {
        let scan = scan_primes(std::iter::empty());
        assert!(scan.bounds.is_empty());
        assert_eq!(scan.bounds.last, None);
        assert!(scan.tracker.is_empty());
    }

    #[test]
    fn test_single_prime_region() {
        let scan = scan_primes([113]);
        assert_eq!(scan.bounds.first, Some(113));
        assert_eq!(scan.bounds.last, Some(113));
        assert!(scan.tracker.is_empty());
    }
}
