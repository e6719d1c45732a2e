use serde::Serialize;
use tvscan_core::{
    BuildConfig, NormalizedSymbol, ScreenerIndex, ScreenerRecord, ScreenerRequest, SymbolNormalizer,
};

use crate::cli::{Cli, LookupArgs};
use crate::error::CliError;
use crate::output::Table;

use super::{format_change, session, CommandResult, Sources};

#[derive(Debug, Serialize)]
struct LookupRow<'a> {
    input: &'a str,
    #[serde(flatten)]
    normalized: NormalizedSymbol,
    record: Option<&'a ScreenerRecord>,
}

pub async fn run(cli: &Cli, args: &LookupArgs, sources: &Sources) -> Result<CommandResult, CliError> {
    let config = BuildConfig::default()
        .with_exchange(&cli.exchange)?
        .with_watchlist_name(args.watchlist.clone())?;
    let normalizer = SymbolNormalizer::default();

    let request = ScreenerRequest::new(config.exchange())
        .with_session(session(cli))
        .with_watchlist(config.watchlist_name().map(str::to_owned));
    let (index, failure) = match sources.screener.fetch_records(&request).await {
        Ok(records) => (ScreenerIndex::build(records, &normalizer), None),
        Err(error) => {
            tracing::error!(code = error.code(), %error, "screener fetch failed");
            (ScreenerIndex::default(), Some(error))
        }
    };

    let mut table = Table::new(vec!["input", "key", "perpetual", "screener", "change_%"]);
    let mut lines = Vec::with_capacity(args.symbols.len());
    let mut rows = Vec::with_capacity(args.symbols.len());

    for input in &args.symbols {
        let normalized = normalizer.analyze(input);
        let record = index.lookup(&normalized.key);

        table.push(vec![
            input.clone(),
            normalized.key.to_string(),
            normalized.perpetual.to_string(),
            record.map_or_else(|| String::from("-"), |r| r.symbol.to_string()),
            record
                .and_then(|r| r.change_percent)
                .map_or_else(|| String::from("-"), format_change),
        ]);
        lines.push(format!("{input} -> {}", normalized.key));
        rows.push(LookupRow {
            input,
            normalized,
            record,
        });
    }

    let unresolved = rows.iter().filter(|row| row.record.is_none()).count();
    let data = serde_json::to_value(&rows)?;

    let mut result = CommandResult::ok(data, table, lines);
    if let Some(error) = failure {
        result = result
            .with_outcome("screener_failed", true)
            .with_warning(error.to_string());
    } else if unresolved > 0 {
        result = result.with_warning(format!("{unresolved} symbols did not resolve"));
    }
    Ok(result)
}
