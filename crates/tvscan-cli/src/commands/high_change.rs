use serde::Serialize;
use tvscan_core::{
    load_watchlist_json, write_symbol_file, BuildConfig, ChangeThreshold, HighChangeResult,
    ListHeader, ProcessingStats, RunOutcome, SymbolListFormat, SyncReport, WatchlistBuilder,
};

use crate::cli::{Cli, HighChangeArgs};
use crate::error::CliError;
use crate::output::Table;

use super::{format_change, session, sync_watchlist, CommandResult, Sources};

/// Movers pushed to an account watchlist when `--top` is not given.
const DEFAULT_SYNC_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
struct HighChangeData<'a> {
    watchlist_name: &'a str,
    threshold: f64,
    ceiling: Option<f64>,
    results: &'a [HighChangeResult],
    stats: &'a ProcessingStats,
    outcome: &'a RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<SyncReport>,
}

pub async fn run(cli: &Cli, args: &HighChangeArgs, sources: &Sources) -> Result<CommandResult, CliError> {
    let threshold = ChangeThreshold::new(args.min_change)?;
    let mut config = BuildConfig::new(threshold);
    if let Some(ceiling) = args.ceiling_override() {
        config = config.with_ceiling(ceiling)?;
    }
    let config = config
        .with_exchange(&cli.exchange)?
        .with_watchlist_name(args.watchlist.clone())?
        .with_session(session(cli));

    let watchlist = match &args.input {
        Some(path) => Some(load_watchlist_json(path)?.ok_or_else(|| {
            CliError::Command(format!("watchlist snapshot '{}' not found", path.display()))
        })?),
        None => None,
    };

    let builder = WatchlistBuilder::new(sources.listing.clone(), sources.screener.clone());
    let report = builder.run(&config, watchlist).await;

    let exported = match args.top {
        Some(n) => report.top(n),
        None => report.results.as_slice(),
    };
    let symbols: Vec<&str> = exported.iter().map(|r| r.symbol.as_str()).collect();

    let mut output_file = None;
    if let Some(dir) = &args.output_dir {
        if symbols.is_empty() {
            tracing::info!("no qualifying symbols, skipping symbol file");
        } else {
            let header = ListHeader::new(format!(
                "High Change Symbols (>= {}% absolute change)",
                threshold.value()
            ));
            let format = if args.exchange_prefix {
                SymbolListFormat::with_exchange_prefix(config.exchange())
            } else {
                SymbolListFormat::default()
            };
            let path = write_symbol_file(dir, "high_change_symbols", &header, &format, &symbols)?;
            output_file = Some(path.display().to_string());
        }
    }

    let mut sync = None;
    let mut sync_warning = None;
    if let Some(name) = &args.sync {
        let movers: Vec<String> = report
            .top(args.top.unwrap_or(DEFAULT_SYNC_LIMIT))
            .iter()
            .map(|r| r.symbol.clone())
            .collect();
        if report.outcome.is_failed() {
            sync_warning = Some(format!("watchlist '{name}' not synced: run did not complete"));
        } else {
            match sync_watchlist(cli, sources, name, config.exchange(), movers).await {
                Ok(synced) => sync = Some(synced),
                Err(warning) => sync_warning = Some(warning),
            }
        }
    }

    let data = serde_json::to_value(HighChangeData {
        watchlist_name: &report.watchlist_name,
        threshold: threshold.value(),
        ceiling: config.ceiling(),
        results: exported,
        stats: &report.stats,
        outcome: &report.outcome,
        output_file,
        sync,
    })?;

    let mut result = CommandResult::ok(data, table(exported), symbols.iter().map(|s| (*s).to_owned()).collect())
        .with_outcome(report.outcome.as_str(), report.outcome.is_failed());

    match &report.outcome {
        RunOutcome::ListingFailed { code, message } | RunOutcome::ScreenerFailed { code, message } => {
            result = result.with_warning(format!("{code}: {message}"));
        }
        RunOutcome::EmptyWatchlist => {
            result = result.with_warning("watchlist is empty");
        }
        RunOutcome::Completed => {}
    }
    if report.stats.unmatched > 0 && !report.outcome.is_failed() {
        result = result.with_warning(format!(
            "{} of {} symbols not found in screener data",
            report.stats.unmatched, report.stats.total_symbols
        ));
    }
    if let Some(n) = args.top.filter(|n| *n < report.results.len()) {
        result = result.with_warning(format!(
            "showing top {n} of {} qualifying symbols",
            report.results.len()
        ));
    }
    if let Some(warning) = sync_warning {
        result = result.with_warning(warning);
    }

    Ok(result)
}

fn table(results: &[HighChangeResult]) -> Table {
    let mut table = Table::new(vec!["#", "symbol", "change_%", "price", "volume"]);
    for (rank, row) in results.iter().enumerate() {
        table.push(vec![
            (rank + 1).to_string(),
            row.symbol.clone(),
            format_change(row.change_percent),
            row.price.to_string(),
            format!("{:.0}", row.volume),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;
    use crate::commands::mock_cli;

    async fn run_with(args: &[&str]) -> CommandResult {
        let cli = mock_cli(args);
        let Command::HighChange(high_change) = &cli.command else {
            panic!("expected high-change");
        };
        run(&cli, high_change, &Sources::for_cli(&cli))
            .await
            .expect("mock run succeeds")
    }

    #[tokio::test]
    async fn when_the_fixture_is_screened_the_system_ranks_movers_by_magnitude() {
        // Given the offline fixture and the default 5% threshold
        // When the high-change command runs
        let result = run_with(&["high-change"]).await;

        // Then movers are ranked by |change| with ties in listing order
        assert_eq!(
            result.lines,
            vec!["SOLUSDT.P", "DOGEUSDT.P", "ARBUSDT.P", "ETHUSDT.P"]
        );
        assert_eq!(result.outcome, "completed");
        assert_eq!(result.data["stats"]["total_symbols"], 8);
        assert_eq!(result.data["stats"]["unmatched_symbols"][0], "NEWUSDT.P");
        assert_eq!(result.data["stats"]["missing_change_symbols"][0], "PEPEUSDT.P");
        assert_eq!(result.data["stats"]["extreme_change_symbols"][0], "WIFUSDT.P");
        assert_eq!(result.table.rows[0][2], "+11.30");
    }

    #[tokio::test]
    async fn when_top_is_set_the_system_exports_only_the_largest_movers() {
        // Given an output directory and a top-2 cap
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().to_string_lossy().into_owned();

        // When the command runs with prefixed export
        let result = run_with(&[
            "high-change",
            "--top",
            "2",
            "--output-dir",
            &out,
            "--exchange-prefix",
        ])
        .await;

        // Then only two symbols are written, each with the exchange prefix
        let path = result.data["output_file"].as_str().expect("file written");
        let text = std::fs::read_to_string(path).expect("readable");
        assert!(text.starts_with("# High Change Symbols"));
        assert!(text.ends_with("BLOFIN:SOLUSDT.P\nBLOFIN:DOGEUSDT.P\n"));
        assert_eq!(result.lines.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("top 2 of 4")));
    }

    #[tokio::test]
    async fn when_threshold_exceeds_the_default_ceiling_the_system_keeps_larger_movers() {
        // Given a threshold above the default 1000% ceiling and a 4250% mover
        // When the command runs without --max-change
        let result = run_with(&["high-change", "--min-change", "1500"]).await;

        // Then the ceiling steps aside and the mover qualifies
        assert_eq!(result.outcome, "completed");
        assert_eq!(result.lines, vec!["WIFUSDT.P"]);
        assert!(result.data["ceiling"].is_null());
        assert_eq!(result.data["threshold"], 1500.0);
        assert!(result.data["stats"]["extreme_change_symbols"]
            .as_array()
            .expect("array")
            .is_empty());
    }

    #[tokio::test]
    async fn when_max_change_is_explicit_the_system_applies_it() {
        // Given an explicit ceiling below the fixture's largest mover
        // When the command runs
        let result = run_with(&["high-change", "--min-change", "10", "--max-change", "20"]).await;

        // Then movers beyond it are bad data and the rest are ranked
        assert_eq!(result.lines, vec!["SOLUSDT.P", "DOGEUSDT.P"]);
        assert_eq!(result.data["ceiling"], 20.0);
        assert_eq!(result.data["stats"]["extreme_change_symbols"][0], "WIFUSDT.P");
    }

    #[tokio::test]
    async fn when_max_change_undercuts_the_threshold_the_system_rejects_it() {
        let cli = mock_cli(&["high-change", "--min-change", "30", "--max-change", "20"]);
        let Command::HighChange(args) = &cli.command else {
            panic!("expected high-change");
        };

        let error = run(&cli, args, &Sources::for_cli(&cli))
            .await
            .err()
            .expect("ceiling below threshold rejected");
        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn when_sync_is_requested_with_a_session_the_system_pushes_the_top_movers() {
        // Given a session and a top-3 cap
        // When the command runs with --sync
        let result = run_with(&[
            "high-change",
            "--top",
            "3",
            "--sync",
            "Movers",
            "--session-id",
            "abc",
        ])
        .await;

        // Then the sink receives the three largest movers
        assert_eq!(result.data["sync"]["name"], "Movers");
        assert_eq!(result.data["sync"]["action"], "created");
        assert_eq!(result.data["sync"]["count"], 3);
        assert!(!result.warnings.iter().any(|w| w.contains("not synced")));
    }

    #[tokio::test]
    async fn when_sync_fails_the_system_warns_and_keeps_the_results() {
        // Given a sink that rejects the session
        let cli = mock_cli(&["high-change", "--sync", "Movers", "--session-id", "expired"]);
        let Command::HighChange(args) = &cli.command else {
            panic!("expected high-change");
        };
        let mut sources = Sources::for_cli(&cli);
        sources.sink = std::sync::Arc::new(
            tvscan_core::StaticSource::default()
                .failing_sync(tvscan_core::SourceError::unauthorized("session expired")),
        );

        // When the command runs
        let result = run(&cli, args, &sources).await.expect("command still succeeds");

        // Then the movers are reported and the sync failure is a warning
        assert_eq!(result.outcome, "completed");
        assert!(!result.failed);
        assert_eq!(result.lines.len(), 4);
        assert!(result.data.get("sync").is_none());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("'Movers' not synced") && w.contains("session expired")));
    }

    #[tokio::test]
    async fn when_the_threshold_is_negative_the_system_fails_before_fetching() {
        let cli = mock_cli(&["high-change", "--min-change=-1"]);
        let Command::HighChange(args) = &cli.command else {
            panic!("expected high-change");
        };

        let error = run(&cli, args, &Sources::for_cli(&cli))
            .await
            .err()
            .expect("negative threshold rejected");
        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn when_the_input_snapshot_is_missing_the_system_reports_a_command_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json").to_string_lossy().into_owned();
        let cli = mock_cli(&["high-change", "--input", &missing]);
        let Command::HighChange(args) = &cli.command else {
            panic!("expected high-change");
        };

        let error = run(&cli, args, &Sources::for_cli(&cli))
            .await
            .err()
            .expect("missing snapshot rejected");
        assert!(matches!(error, CliError::Command(_)));
    }
}
