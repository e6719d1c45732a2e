//! CLI argument definitions for tvscan.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `high-change` | Rank exchange perpetuals by absolute price change |
//! | `listing` | Fetch the exchange perpetual listing |
//! | `lookup` | Show how symbols normalize and what they resolve to |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table, text) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--exchange` | `BLOFIN` | Exchange to screen |
//! | `--session-id` | `$TRADINGVIEW_SESSION_ID` | Account session cookie |
//! | `--mock` | `false` | Use built-in offline data |
//! | `--timeout-ms` | `15000` | Request timeout in ms |
//! | `-v` | | Raise log verbosity (repeatable) |
//! | `--log-format` | `pretty` | Log format on stderr (pretty, json) |
//!
//! # Examples
//!
//! ```bash
//! # Movers of at least 8% on BloFin, top 50 written to ./out
//! tvscan high-change --min-change 8 --top 50 --output-dir out --format table
//!
//! # Restrict the screener to an account watchlist
//! TRADINGVIEW_SESSION_ID=... tvscan high-change --watchlist "Perps"
//!
//! # Push the 30 largest movers to an account watchlist
//! TRADINGVIEW_SESSION_ID=... tvscan high-change --top 30 --sync "Movers"
//!
//! # Offline run
//! tvscan --mock high-change --pretty
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tvscan_core::{DEFAULT_EXCHANGE, DEFAULT_MIN_CHANGE_PERCENT};

/// Screen exchange perpetuals for large price moves.
#[derive(Debug, Parser)]
#[command(name = "tvscan", author, version, about = "Screen exchange perpetuals for large price moves")]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Exchange whose perpetuals are listed and screened.
    #[arg(long, global = true, default_value = DEFAULT_EXCHANGE)]
    pub exchange: String,

    /// Account session cookie used for named watchlists.
    #[arg(long, global = true, env = "TRADINGVIEW_SESSION_ID", hide_env_values = true)]
    pub session_id: Option<String>,

    /// Serve listing and screener data from a built-in offline fixture.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Request timeout budget in milliseconds.
    #[arg(long, global = true, default_value_t = 15_000)]
    pub timeout_ms: u64,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object with `meta` and `data`.
    Json,
    /// Aligned columns.
    Table,
    /// One symbol per line.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank symbols whose absolute change meets the threshold.
    HighChange(HighChangeArgs),
    /// Fetch the exchange perpetual listing.
    Listing(ListingArgs),
    /// Show normalization and screener resolution for symbols.
    Lookup(LookupArgs),
}

#[derive(Debug, Clone, Args)]
pub struct HighChangeArgs {
    /// Minimum absolute change in percent.
    #[arg(long, default_value_t = DEFAULT_MIN_CHANGE_PERCENT)]
    pub min_change: f64,

    /// Changes beyond this are treated as bad data and skipped. Defaults to
    /// 1000, and is off when `--min-change` is above that.
    #[arg(long, conflicts_with = "no_ceiling")]
    pub max_change: Option<f64>,

    /// Disable the sanity ceiling.
    #[arg(long, default_value_t = false)]
    pub no_ceiling: bool,

    /// Restrict the screener to this account watchlist (needs a session).
    #[arg(long)]
    pub watchlist: Option<String>,

    /// Load the base watchlist from a JSON snapshot instead of the exchange listing.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Only report and export the N largest movers.
    #[arg(long)]
    pub top: Option<usize>,

    /// Write `high_change_symbols_<timestamp>.txt` into this directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Prefix exported symbols with `EXCHANGE:`.
    #[arg(long, default_value_t = false)]
    pub exchange_prefix: bool,

    /// Push the top movers (at most `--top`, else 50) to this account
    /// watchlist. Needs a session.
    #[arg(long, value_name = "NAME")]
    pub sync: Option<String>,
}

impl HighChangeArgs {
    /// Ceiling chosen on the command line. `None` keeps the default rule.
    pub fn ceiling_override(&self) -> Option<Option<f64>> {
        if self.no_ceiling {
            Some(None)
        } else {
            self.max_change.map(Some)
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ListingArgs {
    /// Write `<exchange>_perpetuals_<timestamp>.txt` into this directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Also save the listing as a watchlist JSON snapshot.
    #[arg(long)]
    pub save_json: Option<PathBuf>,

    /// Prefix exported symbols with `EXCHANGE:`.
    #[arg(long, default_value_t = false)]
    pub exchange_prefix: bool,

    /// Push the whole listing to this account watchlist. Needs a session.
    #[arg(long, value_name = "NAME")]
    pub sync: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct LookupArgs {
    /// Raw symbols, e.g. `BTCUSDT.P` or `BLOFIN:ETHUSDT`.
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Resolve against this account watchlist's screener rows.
    #[arg(long)]
    pub watchlist: Option<String>,
}
