use std::ops::Range;

use crate::config::Domain;
use crate::error::GapError;

/// Split of the extension range [base_end, limit) into one contiguous
/// half-open range per worker. Worker 0 also scans the base region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    domain: Domain,
    workers: usize,
}

impl Partition {
    pub fn new(domain: Domain, workers: usize) -> Result<Self, GapError> {
        if workers < 2 {
            return Err(GapError::TooFewWorkers { workers });
        }
        Ok(Partition { domain, workers })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extension range sieved by `worker`. The last worker absorbs the remainder.
    pub fn range(&self, worker: usize) -> Range<usize> {
        debug_assert!(worker < self.workers);
        let per_worker = self.domain.extension_len() / self.workers;
        let start = self.domain.base_end() + per_worker * worker;
        let end = if worker == self.workers - 1 {
            self.domain.limit()
        } else {
            start + per_worker
        };
        start..end
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.workers).map(|w| self.range(w))
    }
}
