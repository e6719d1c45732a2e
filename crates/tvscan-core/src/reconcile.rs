//! Joins a watchlist against a screener index.

use serde::Serialize;

use crate::{MatchedEntry, ScreenerIndex, Symbol, SymbolNormalizer, Watchlist};

/// Outcome of joining every watchlist symbol against the screener index.
///
/// Both lists follow watchlist order and together account for every
/// watchlist symbol exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub matched: Vec<MatchedEntry>,
    pub unmatched: Vec<Symbol>,
}

impl Reconciliation {
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }
}

/// Resolve each watchlist symbol to its screener row.
///
/// A miss is recorded and the walk continues; no symbol can end the loop
/// early.
pub fn reconcile(
    watchlist: &Watchlist,
    index: &ScreenerIndex,
    normalizer: &SymbolNormalizer,
) -> Reconciliation {
    let mut matched = Vec::with_capacity(watchlist.len());
    let mut unmatched = Vec::new();

    for symbol in watchlist.symbols() {
        let key = normalizer.normalize(symbol.as_str());
        match index.lookup(&key) {
            Some(record) => {
                if record.symbol != *symbol {
                    tracing::debug!(symbol = %symbol, screener = %record.symbol, "matched via normalized key");
                }
                matched.push(MatchedEntry {
                    symbol: symbol.clone(),
                    key,
                    record: record.clone(),
                });
            }
            None => {
                tracing::debug!(symbol = %symbol, key = %key, "symbol not found in screener data");
                unmatched.push(symbol.clone());
            }
        }
    }

    let reconciliation = Reconciliation { matched, unmatched };
    debug_assert_eq!(reconciliation.total(), watchlist.len());

    tracing::info!(
        matched = reconciliation.matched.len(),
        total = watchlist.len(),
        "matched watchlist symbols with screener data"
    );
    if !reconciliation.unmatched.is_empty() {
        let preview: Vec<&str> = reconciliation
            .unmatched
            .iter()
            .take(10)
            .map(Symbol::as_str)
            .collect();
        tracing::warn!(
            missing = reconciliation.unmatched.len(),
            preview = ?preview,
            "symbols missing from screener data"
        );
    }

    reconciliation
}
