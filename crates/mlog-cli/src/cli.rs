//! Command-line argument definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mlog_core::{RangeError, RangeSpec};

/// Automatic activity tracker.
///
/// Samples the focused application and window on a fixed interval and
/// reports where the time went.
#[derive(Debug, Parser)]
#[command(name = "mlog", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample the focused window until interrupted.
    Record,

    /// Show time per application for a range.
    Report {
        #[command(flatten)]
        range: RangeArgs,

        /// Hide applications and windows below this many minutes.
        #[arg(short, long)]
        threshold: Option<u64>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show time per window for one application.
    Detail {
        /// Application name, matched ignoring case.
        application: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve reports over HTTP.
    Serve {
        /// Address to listen on (overrides config).
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Show recording status.
    Status,
}

/// Range selection shared by `report` and `detail`. Defaults to today.
#[derive(Debug, Clone, Copy, Default, Args)]
#[group(multiple = false)]
pub struct RangeArgs {
    /// Since local midnight.
    #[arg(long)]
    pub today: bool,

    /// The previous calendar day.
    #[arg(long)]
    pub yesterday: bool,

    /// The last seven days up to now.
    #[arg(long)]
    pub week: bool,

    /// The last four weeks up to now.
    #[arg(long)]
    pub month: bool,

    /// The last N whole days, excluding today.
    #[arg(long, value_name = "N")]
    pub days: Option<i64>,

    /// The last N weeks up to now.
    #[arg(long, value_name = "N")]
    pub weeks: Option<i64>,
}

impl RangeArgs {
    pub fn spec(&self) -> Result<RangeSpec, RangeError> {
        if let Some(n) = self.days {
            return RangeSpec::days(n);
        }
        if let Some(n) = self.weeks {
            return RangeSpec::weeks(n);
        }
        Ok(if self.yesterday {
            RangeSpec::Yesterday
        } else if self.week {
            RangeSpec::Weeks(1)
        } else if self.month {
            RangeSpec::Month
        } else {
            RangeSpec::Today
        })
    }
}
