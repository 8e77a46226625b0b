use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::GapError;

/// Byte value of a number that has not been crossed out.
const PRIME: u8 = 1;
const COMPOSITE: u8 = 0;

/// Allocate `len` sieve flags, all set to "provisionally prime".
///
/// Uses `try_reserve_exact` so an out-of-memory condition comes back as
/// `AllocationFailure` instead of aborting the process.
pub fn allocate_flags(worker: usize, len: usize) -> Result<Vec<u8>, GapError> {
    let mut flags = Vec::new();
    flags
        .try_reserve_exact(len)
        .map_err(|_| GapError::AllocationFailure { worker, bytes: len })?;
    flags.resize(len, PRIME);
    Ok(flags)
}

/// Source of extension-region memory. Lets a run swap in a failing allocator.
pub trait RegionAllocator: Sync {
    fn allocate(&self, worker: usize, len: usize) -> Result<Vec<u8>, GapError>;
}

/// The process heap.
pub struct HeapAllocator;

impl RegionAllocator for HeapAllocator {
    fn allocate(&self, worker: usize, len: usize) -> Result<Vec<u8>, GapError> {
        allocate_flags(worker, len)
    }
}

/// Sieve flags for the shared prefix [0, end).
///
/// Several workers may cross out the same byte at the same time. Every writer
/// stores the same value (COMPOSITE) and nobody reads-modifies-writes, so
/// relaxed atomic stores are enough and no lock is taken. A worker that reads a
/// stale PRIME for a composite only crosses out that composite's multiples,
/// which are composite anyway.
pub struct BaseRegion {
    flags: Vec<AtomicU8>,
}

impl BaseRegion {
    pub fn try_new(worker: usize, end: usize) -> Result<Self, GapError> {
        let mut flags = Vec::new();
        flags
            .try_reserve_exact(end)
            .map_err(|_| GapError::AllocationFailure { worker, bytes: end })?;
        flags.extend((0..end).map(|n| AtomicU8::new(if n >= 2 { PRIME } else { COMPOSITE })));
        Ok(BaseRegion { flags })
    }

    pub fn end(&self) -> usize {
        self.flags.len()
    }

    pub fn is_prime(&self, n: usize) -> bool {
        self.flags[n].load(Ordering::Relaxed) != COMPOSITE
    }

    /// Classic Eratosthenes over the whole region by a single writer.
    pub fn sieve(&self) {
        self.sieve_stripe(0, 1);
    }

    /// Sieve with the candidate divisors dealt round-robin to `workers`
    /// writers; this call handles stripe `worker`. Once every stripe has run
    /// (and the callers have synchronised) the region is exact.
    pub fn sieve_stripe(&self, worker: usize, workers: usize) {
        let end = self.end();
        let candidates = (2..end).take_while(|&i| i * i < end);

        for i in candidates.skip(worker).step_by(workers.max(1)) {
            if !self.is_prime(i) {
                continue;
            }

            let mut j = i * i;
            while j < end {
                self.flags[j].store(COMPOSITE, Ordering::Relaxed);
                j += i;
            }
        }
    }

    pub fn primes(&self) -> impl Iterator<Item = usize> + '_ {
        (2..self.end()).filter(|&n| self.is_prime(n))
    }
}

/// A worker's private slice of the extension range: flags[i] describes start + i.
pub struct Segment<'a> {
    start: usize,
    flags: &'a mut [u8],
}

impl<'a> Segment<'a> {
    /// Wrap freshly allocated flags (see `allocate_flags`), all still prime.
    pub fn new(start: usize, flags: &'a mut [u8]) -> Self {
        Segment { start, flags }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.start + self.flags.len()
    }

    /// Cross out every multiple of every base prime inside [start, end).
    pub fn sieve(&mut self, base_primes: &[usize]) {
        let (start, end) = (self.start, self.end());

        for &p in base_primes {
            // Smallest multiple of p >= start, never p itself
            let mut j = ((start + p - 1) / p * p).max(p * p);
            while j < end {
                self.flags[j - start] = COMPOSITE;
                j += p;
            }
        }
    }

    pub fn primes(&self) -> impl Iterator<Item = usize> + '_ {
        let start = self.start;
        self.flags
            .iter()
            .enumerate()
            .filter(move |&(i, &flag)| flag != COMPOSITE && start + i >= 2)
            .map(move |(i, _)| start + i)
    }
}
