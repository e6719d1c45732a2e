//! Offline listing and screener fixture behind `--mock`.

use tvscan_core::{ScreenerRecord, StaticSource, Symbol};

const LISTING: [&str; 8] = [
    "BTCUSDT.P",
    "ETHUSDT.P",
    "SOLUSDT.P",
    "DOGEUSDT.P",
    "PEPEUSDT.P",
    "WIFUSDT.P",
    "ARBUSDT.P",
    "NEWUSDT.P",
];

/// `(symbol, change %, price, volume)`; `NEWUSDT.P` is absent on purpose.
const ROWS: [(&str, Option<f64>, Option<f64>, Option<f64>); 8] = [
    ("BTCUSDT.P", Some(2.4), Some(64_250.5), Some(18_250.0)),
    ("ETHUSDT", Some(-6.8), Some(3_120.25), Some(92_400.0)),
    ("SOLUSDT.P", Some(11.3), Some(148.7), Some(410_000.0)),
    ("DOGEUSDT.P", Some(-11.3), Some(0.1432), None),
    ("PEPEUSDT.P", None, Some(0.000_012), Some(9.1e9)),
    ("WIFUSDT.P", Some(4_250.0), Some(2.2), Some(1_000.0)),
    ("ARBUSDT.P", Some(7.9), Some(-1.0), Some(55_000.0)),
    ("XRPUSDT.P", Some(25.0), Some(0.52), Some(700_000.0)),
];

pub fn source() -> StaticSource {
    let records = ROWS
        .iter()
        .filter_map(|(symbol, change, price, volume)| {
            Symbol::parse(symbol)
                .ok()
                .map(|symbol| ScreenerRecord::new(symbol, *change, *price, *volume))
        })
        .collect();

    StaticSource::new(LISTING.iter().map(|s| (*s).to_owned()).collect(), records)
}
