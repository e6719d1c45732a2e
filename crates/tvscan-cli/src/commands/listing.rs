use serde::Serialize;
use tvscan_core::{
    save_watchlist_json, write_symbol_file, BuildConfig, InstrumentClass, ListHeader,
    ListingRequest, SymbolListFormat, SyncReport, Watchlist,
};

use crate::cli::{Cli, ListingArgs};
use crate::error::CliError;
use crate::output::Table;

use super::{sync_watchlist, CommandResult, Sources};

#[derive(Debug, Serialize)]
struct ListingData<'a> {
    exchange: &'a str,
    count: usize,
    symbols: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<SyncReport>,
}

pub async fn run(cli: &Cli, args: &ListingArgs, sources: &Sources) -> Result<CommandResult, CliError> {
    let exchange = BuildConfig::default().with_exchange(&cli.exchange)?.exchange().to_owned();
    let name = format!("{exchange} perpetuals");

    let raw_symbols = match ListingRequest::new(&exchange, InstrumentClass::PerpetualFutures) {
        Ok(request) => sources.listing.list_symbols(&request).await,
        Err(error) => Err(error),
    };
    let raw_symbols = match raw_symbols {
        Ok(symbols) => symbols,
        Err(error) => {
            tracing::error!(code = error.code(), %error, "exchange listing fetch failed");
            let data = serde_json::to_value(ListingData {
                exchange: &exchange,
                count: 0,
                symbols: Vec::new(),
                output_file: None,
                snapshot_file: None,
                sync: None,
            })?;
            return Ok(CommandResult::ok(data, Table::new(vec!["#", "symbol"]), Vec::new())
                .with_outcome("listing_failed", true)
                .with_warning(error.to_string()));
        }
    };

    let watchlist = Watchlist::from_listing(name, raw_symbols)?;
    let symbols: Vec<&str> = watchlist.symbols().iter().map(|s| s.as_str()).collect();

    let mut output_file = None;
    if let Some(dir) = &args.output_dir {
        let header = ListHeader::new(format!("{exchange} Perpetual Futures"));
        let format = if args.exchange_prefix {
            SymbolListFormat::with_exchange_prefix(&exchange)
        } else {
            SymbolListFormat::default()
        };
        let stem = format!("{}_perpetuals", exchange.to_ascii_lowercase());
        let path = write_symbol_file(dir, &stem, &header, &format, &symbols)?;
        output_file = Some(path.display().to_string());
    }

    let mut snapshot_file = None;
    if let Some(path) = &args.save_json {
        save_watchlist_json(path, &watchlist)?;
        snapshot_file = Some(path.display().to_string());
    }

    let mut sync = None;
    let mut sync_warning = None;
    if let Some(name) = &args.sync {
        let all: Vec<String> = symbols.iter().map(|s| (*s).to_owned()).collect();
        match sync_watchlist(cli, sources, name, &exchange, all).await {
            Ok(synced) => sync = Some(synced),
            Err(warning) => sync_warning = Some(warning),
        }
    }

    let mut table = Table::new(vec!["#", "symbol"]);
    for (index, symbol) in symbols.iter().enumerate() {
        table.push(vec![(index + 1).to_string(), (*symbol).to_owned()]);
    }
    let lines = symbols.iter().map(|s| (*s).to_owned()).collect();

    let data = serde_json::to_value(ListingData {
        exchange: &exchange,
        count: symbols.len(),
        symbols,
        output_file,
        snapshot_file,
        sync,
    })?;

    let mut result = CommandResult::ok(data, table, lines);
    if let Some(warning) = sync_warning {
        result = result.with_warning(warning);
    }
    if watchlist.is_empty() {
        return Ok(result
            .with_outcome("empty_watchlist", false)
            .with_warning(format!("{exchange} listed no perpetual symbols")));
    }
    Ok(result)
}
