mod comm;
mod config;
mod distributed;
mod error;
mod logger;
mod partition;
mod reduce;
mod report;
mod scan;
mod serial;
mod shared;
mod sieve;
mod stitch;
mod tracker;

use std::io;

use clap::{Parser, Subcommand};

use crate::config::{Domain, RANKS_VAR, THREADS_VAR};
use crate::error::GapError;
use crate::reduce::TieBreak;
use crate::report::GapReport;
use crate::sieve::HeapAllocator;

#[derive(Parser)]
#[command(name = "primegaps")]
#[command(about = "Five largest gaps between consecutive primes below one billion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Single-worker reference sieve")]
    Serial,
    #[command(about = "Shared-memory threads (worker count from GAPS_THREADS)")]
    Threads,
    #[command(about = "Message-passing ranks (rank count from GAPS_RANKS)")]
    Distributed,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init();

    let domain = Domain::default();

    let outcome: Result<GapReport, GapError> = match cli.command {
        Commands::Serial => serial::run(domain),
        Commands::Threads => {
            let mut workers = config::worker_count(THREADS_VAR)?;
            if workers < 2 {
                tracing::warn!("{} worker(s) requested, running with 2", workers);
                workers = 2;
            }
            tracing::info!("Using {} worker threads", workers);
            shared::run(domain, workers, TieBreak::default())
        }
        Commands::Distributed => {
            let ranks = config::worker_count(RANKS_VAR)?;
            tracing::info!("Using {} ranks", ranks);
            distributed::run(domain, ranks, TieBreak::default(), &HeapAllocator).and_then(
                |outcomes| {
                    outcomes
                        .into_iter()
                        .next()
                        .unwrap_or(Err(GapError::TooFewWorkers { workers: 0 }))
                },
            )
        }
    };

    if let Err(err) = &outcome {
        if !err.is_reported() {
            return Err(err.clone().into());
        }
    }

    report::render(&mut io::stdout().lock(), &outcome)?;
    Ok(())
}
