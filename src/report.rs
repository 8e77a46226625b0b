use std::io::{self, Write};
use std::time::Duration;

use crate::error::GapError;
use crate::tracker::TopFive;

pub const ALLOCATION_DIAGNOSTIC: &str = "Failed to allocate the memory.";
pub const WORKERS_DIAGNOSTIC: &str = "This program needs to be run with multiple workers.";

/// Result of one complete run, as seen by the reporting worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapReport {
    pub gaps: TopFive,
    /// Sieve + reduce time, excluding allocation and worker start-up.
    pub elapsed: Duration,
}

/// One-line message printed instead of a report when a run is abandoned.
pub fn diagnostic(err: &GapError) -> String {
    match err {
        GapError::AllocationFailure { .. } | GapError::PeerAllocationFailure => {
            ALLOCATION_DIAGNOSTIC.to_string()
        }
        GapError::TooFewWorkers { .. } => WORKERS_DIAGNOSTIC.to_string(),
        other => other.to_string(),
    }
}

pub fn write_report<W: Write>(out: &mut W, report: &GapReport) -> io::Result<()> {
    let mut itoa_buf = itoa::Buffer::new();

    writeln!(
        out,
        "Now, print the {} biggest distances between two consecutive prime numbers.",
        report.gaps.len()
    )?;

    for gap in report.gaps.iter() {
        out.write_all(b"Between consecutive primes (")?;
        out.write_all(itoa_buf.format(gap.small).as_bytes())?;
        out.write_all(b") and (")?;
        out.write_all(itoa_buf.format(gap.large).as_bytes())?;
        out.write_all(b"), the distance is (")?;
        out.write_all(itoa_buf.format(gap.distance).as_bytes())?;
        out.write_all(b").\n")?;
    }

    writeln!(
        out,
        "Total time taken: {:.6} seconds",
        report.elapsed.as_secs_f64()
    )
}

/// Print either the report or the diagnostic of the error that ended the run.
pub fn render<W: Write>(out: &mut W, outcome: &Result<GapReport, GapError>) -> io::Result<()> {
    match outcome {
        Ok(report) => write_report(out, report),
        Err(err) => writeln!(out, "{}", diagnostic(err)),
    }
}
