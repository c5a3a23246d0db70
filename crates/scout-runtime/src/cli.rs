use std::path::PathBuf;

use clap::Parser;

use crate::config::{Mode, ScoutConfig};

/// Discover public proxies, probe every protocol, keep the working ones.
#[derive(Parser, Debug)]
#[command(name = "proxy-scout")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Extra config file, merged last
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Candidate consumption mode
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Sink worker count (clamped to 1..=1000)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log filter, e.g. `info` or `info,ps_03_proxy_prober=debug`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    /// Command-line values take precedence over files and environment.
    pub fn apply(&self, config: &mut ScoutConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(workers) = self.workers {
            config.sink.workers = workers;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = Some(level.clone());
        }
        if self.json_logs {
            config.logging.json = Some(true);
        }
    }
}
