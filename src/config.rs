use std::env;

use crate::error::GapError;

/// Upper bound of the search. Primes are taken from [2, MAX_NUMBER).
pub const MAX_NUMBER: usize = 1_000_000_000;

/// End of the shared base region. Must satisfy BASE_END * BASE_END > MAX_NUMBER
/// so the base primes alone sieve every extension region.
pub const BASE_END: usize = 32_000;

/// Number of gaps reported.
pub const GAP_COUNT: usize = 5;

/// Worker count for the thread shape.
pub const THREADS_VAR: &str = "GAPS_THREADS";

/// Rank count for the distributed shape.
pub const RANKS_VAR: &str = "GAPS_RANKS";

/// Numeric domain being searched: primes in [2, limit), base region [0, base_end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    limit: usize,
    base_end: usize,
}

impl Domain {
    pub fn new(limit: usize, base_end: usize) -> Result<Self, GapError> {
        let covers = base_end
            .checked_mul(base_end)
            .map_or(true, |square| square > limit);

        if base_end <= 2 || base_end > limit || !covers {
            return Err(GapError::InvalidDomain { limit, base_end });
        }

        Ok(Domain { limit, base_end })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn base_end(&self) -> usize {
        self.base_end
    }

    /// Size of the extension range [base_end, limit).
    pub fn extension_len(&self) -> usize {
        self.limit - self.base_end
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain {
            limit: MAX_NUMBER,
            base_end: BASE_END,
        }
    }
}

/// Resolve a worker count once at start: the environment variable wins,
/// otherwise the machine's available parallelism.
pub fn worker_count(var: &str) -> Result<usize, GapError> {
    match env::var(var) {
        Ok(value) => parse_worker_count(var, &value),
        Err(_) => Ok(std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)),
    }
}

/// Any integer is accepted here; counts below 2 are the partition's call.
fn parse_worker_count(var: &str, value: &str) -> Result<usize, GapError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| GapError::InvalidWorkerCount {
            var: var.to_string(),
            value: value.to_string(),
        })
}
