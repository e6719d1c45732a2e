mod high_change;
mod listing;
mod lookup;
mod mock;

use std::sync::Arc;

use serde_json::Value;
use tvscan_core::{
    ListingSource, ReqwestHttpClient, ScreenerSource, SessionCredential, SyncReport, SyncRequest,
    TradingViewSource, UtcDateTime, WatchlistSink,
};
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{CommandOutput, Report, ReportMeta, Table};

pub struct CommandResult {
    pub data: Value,
    pub outcome: &'static str,
    pub failed: bool,
    pub warnings: Vec<String>,
    pub table: Table,
    pub lines: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value, table: Table, lines: Vec<String>) -> Self {
        Self {
            data,
            outcome: "completed",
            failed: false,
            warnings: Vec::new(),
            table,
            lines,
        }
    }

    pub fn with_outcome(mut self, outcome: &'static str, failed: bool) -> Self {
        self.outcome = outcome;
        self.failed = failed;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Listing, screener and watchlist-sink collaborators for this invocation.
#[derive(Clone)]
pub struct Sources {
    pub listing: Arc<dyn ListingSource>,
    pub screener: Arc<dyn ScreenerSource>,
    pub sink: Arc<dyn WatchlistSink>,
}

impl Sources {
    pub fn for_cli(cli: &Cli) -> Self {
        if cli.mock {
            tracing::info!("using offline fixture data");
            let source = Arc::new(mock::source());
            return Self {
                listing: source.clone(),
                screener: source.clone(),
                sink: source,
            };
        }

        let source = Arc::new(
            TradingViewSource::new(Arc::new(ReqwestHttpClient::new()))
                .with_timeout_ms(cli.timeout_ms),
        );
        Self {
            listing: source.clone(),
            screener: source.clone(),
            sink: source,
        }
    }
}

/// The session flag or `TRADINGVIEW_SESSION_ID`; blank values count as absent.
pub fn session(cli: &Cli) -> Option<SessionCredential> {
    cli.session_id.as_deref().and_then(SessionCredential::new)
}

/// Push `symbols` to the account watchlist `name`.
///
/// A failed sync never fails the command; the local output stands and the
/// failure comes back as a warning.
pub(crate) async fn sync_watchlist(
    cli: &Cli,
    sources: &Sources,
    name: &str,
    exchange: &str,
    symbols: Vec<String>,
) -> Result<SyncReport, String> {
    let request = SyncRequest::new(name, exchange, symbols)
        .map_err(|error| format!("watchlist sync skipped: {error}"))?
        .with_session(session(cli));
    if request.session.is_none() {
        tracing::info!(name, "no session, symbols saved locally only");
        return Err(format!(
            "watchlist '{name}' not synced: no session, saved locally only"
        ));
    }

    sources.sink.sync_watchlist(&request).await.map_err(|error| {
        tracing::warn!(name, code = error.code(), %error, "watchlist sync failed");
        format!("watchlist '{name}' not synced, saved locally only: {error}")
    })
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let sources = Sources::for_cli(cli);

    let (command, result) = match &cli.command {
        Command::HighChange(args) => ("high-change", high_change::run(cli, args, &sources).await?),
        Command::Listing(args) => ("listing", listing::run(cli, args, &sources).await?),
        Command::Lookup(args) => ("lookup", lookup::run(cli, args, &sources).await?),
    };

    let CommandResult {
        data,
        outcome,
        failed,
        warnings,
        table,
        lines,
    } = result;

    Ok(CommandOutput {
        report: Report {
            meta: ReportMeta {
                run_id: Uuid::new_v4().to_string(),
                generated_at: UtcDateTime::now(),
                command,
                outcome,
                warnings,
            },
            data,
        },
        table,
        lines,
        failed,
    })
}

pub(crate) fn format_change(change: f64) -> String {
    format!("{change:+.2}")
}

#[cfg(test)]
pub(crate) fn mock_cli(args: &[&str]) -> Cli {
    use clap::Parser;

    let mut argv = vec!["tvscan", "--mock"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("valid test arguments")
}
