pub mod clear;
pub mod serve;
pub mod stats;

pub use clear::execute as clear_execute;
pub use serve::execute as serve_execute;
pub use stats::execute as stats_execute;

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Flags accepted both at the top level and by `capro serve`.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Origin the proxy forwards cache misses to [default: https://api.github.com]
    #[arg(long)]
    pub origin: Option<String>,

    /// File the cache is persisted to [default: cache.json]
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Origin request timeout, e.g. "30s" or "1m" [default: 30s]
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl ServeArgs {
    pub fn is_set(&self) -> bool {
        self.port.is_some() || self.origin.is_some() || self.cache_file.is_some() || self.timeout.is_some()
    }
}
