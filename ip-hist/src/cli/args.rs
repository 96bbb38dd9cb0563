//! CLI argument definitions

use clap::Parser;
use ip_hist_common::DEFAULT_PIN_PATH;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "ip-hist",
    version,
    about = "Plot per-CPU packet counts from a pinned eBPF map",
    after_help = "\
EXAMPLES:
    sudo ip-hist                                    Chart the default pinned counter
    sudo ip-hist --refresh 250 --max-series 120     Faster refresh, longer history
    sudo ip-hist --headless --duration 10           JSON lines on stdout for 10 seconds"
)]
pub struct Args {
    /// Pinned per-CPU counter map to read
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PIN_PATH)]
    pub pinned_file: PathBuf,

    /// Refresh interval in milliseconds
    #[arg(long, value_name = "MS", default_value = "1000",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh: u64,

    /// Points kept per CPU series on the chart
    #[arg(long, value_name = "N", default_value = "60")]
    pub max_series: usize,

    /// Print one JSON line per snapshot instead of drawing the chart
    #[arg(long)]
    pub headless: bool,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh)
    }

    /// `None` when running until interrupted
    #[must_use]
    pub fn duration_limit(&self) -> Option<Duration> {
        (self.duration > 0).then(|| Duration::from_secs(self.duration))
    }
}
