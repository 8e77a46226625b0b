use std::time::Instant;

use crate::config::Domain;
use crate::error::GapError;
use crate::report::GapReport;
use crate::sieve::allocate_flags;
use crate::tracker::TopFive;

/// Single worker, no partitioning: one byte per number over [0, limit),
/// crossing out multiples and tracking gaps in the same ascending pass.
///
/// This is the reference every partitioned run has to agree with.
pub fn run(domain: Domain) -> Result<GapReport, GapError> {
    let limit = domain.limit();
    let mut is_prime = allocate_flags(0, limit)?;

    let start = Instant::now();
    let mut gaps = TopFive::new();
    let mut last_prime: Option<usize> = None;

    for i in 2..limit {
        if is_prime[i] == 0 {
            continue;
        }

        let mut j = i.saturating_mul(i);
        while j < limit {
            is_prime[j] = 0;
            j += i;
        }

        if let Some(prev) = last_prime {
            gaps.insert(i - prev, prev, i);
        }
        last_prime = Some(i);
    }

    let elapsed = start.elapsed();
    tracing::info!("serial sieve finished in {:?}", elapsed);

    Ok(GapReport { gaps, elapsed })
}
