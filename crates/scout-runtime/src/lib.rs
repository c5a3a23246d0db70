//! # Proxy-Scout Runtime
//!
//! Process entry point and wiring for the scout.
//!
//! ## Modules
//!
//! - `config` - TOML configuration with search-path merge and env overrides
//! - `cli` - command-line flags layered over the configuration
//! - `metered` - metric decorators around subsystem ports
//! - `pipeline` - feed, stream-stage, sink and bulk-cycle wiring
//!
//! ## Startup Sequence
//!
//! 1. Parse flags, load and validate configuration
//! 2. Install logging and register metrics
//! 3. Open the dedup store and result file
//! 4. Spawn feeds, stream stages and the sink or bulk cycle
//! 5. Wait for SIGINT/SIGTERM, cancel, join, log the summary

pub mod cli;
pub mod config;
pub mod metered;
pub mod pipeline;

pub use cli::Args;
pub use config::{ConfigError, Mode, ScoutConfig};
pub use pipeline::{build_parts, Pipeline, PipelineParts, RunSummary};

use tracing::info;

/// Log the final bookkeeping of a run.
pub fn log_summary(summary: &RunSummary) {
    if let Some(sink) = &summary.sink {
        info!(
            received = sink.received,
            skipped = sink.skipped,
            probed = sink.probed,
            persisted = sink.persisted,
            store_errors = sink.store_errors,
            mark_errors = sink.mark_errors,
            "sink summary"
        );
    }
    if let Some(bulk) = &summary.bulk {
        info!(
            fed = summary.fed,
            cycles = bulk.total_cycles(),
            failures = bulk.total_failures,
            "bulk summary"
        );
    }
    for (name, state) in &summary.sources {
        info!(
            source = %name,
            polls = state.total_cycles(),
            failures = state.total_failures,
            "source summary"
        );
    }
}
