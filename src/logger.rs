use std::io;

use tracing_subscriber::filter::{Builder, LevelFilter};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Filter directives, e.g. `GAPS_LOG=debug` or `GAPS_LOG=primegaps::comm=trace`.
pub const LOG_VAR: &str = "GAPS_LOG";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn filter_builder() -> Builder {
    tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_VAR)
}

/// Install a stderr subscriber filtered by `GAPS_LOG` (warn when unset).
/// Stdout stays reserved for the report.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter_builder().from_env_lossy())
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_writer(io::stderr)
        .init();
}
