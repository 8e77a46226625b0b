use thiserror::Error;

/// Every way a run can fail. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GapError {
    /// A worker could not obtain memory for its sieve region.
    #[error("worker {worker} failed to allocate {bytes} bytes")]
    AllocationFailure { worker: usize, bytes: usize },

    /// The partition needs at least two workers.
    #[error("{workers} worker(s) requested, at least 2 are required")]
    TooFewWorkers { workers: usize },

    /// The base region does not cover the limit (base_end^2 <= limit).
    #[error("base region end {base_end} does not cover limit {limit}")]
    InvalidDomain { limit: usize, base_end: usize },

    /// A worker-count variable was set to something that is not an integer.
    #[error("{var}={value:?} is not a worker count")]
    InvalidWorkerCount { var: String, value: String },

    /// Memory allocation failed on another rank; learned through the collective check.
    #[error("another worker failed to allocate its sieve region")]
    PeerAllocationFailure,

    /// A peer endpoint went away in the middle of a protocol step.
    #[error("rank {rank} disconnected")]
    Disconnected { rank: usize },

    /// A message did not carry what the protocol step expected.
    #[error("unexpected message from rank {rank}")]
    UnexpectedMessage { rank: usize },
}

impl GapError {
    /// Errors that end the run with a diagnostic on stdout and exit status 0.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            GapError::AllocationFailure { .. }
                | GapError::PeerAllocationFailure
                | GapError::TooFewWorkers { .. }
        )
    }
}
