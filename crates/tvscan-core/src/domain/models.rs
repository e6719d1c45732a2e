use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{NormalizedKey, Symbol, UtcDateTime, ValidationError};

/// Ordered set of raw symbols a user tracks.
///
/// Raw symbols are unique within one watchlist and keep source order; that
/// order is what unranked output and diagnostics follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WatchlistSnapshot")]
pub struct Watchlist {
    name: String,
    symbols: Vec<Symbol>,
    created_at: UtcDateTime,
    updated_at: UtcDateTime,
}

#[derive(Deserialize)]
struct WatchlistSnapshot {
    name: String,
    symbols: Vec<Symbol>,
    created_at: UtcDateTime,
    #[serde(default)]
    updated_at: Option<UtcDateTime>,
}

impl TryFrom<WatchlistSnapshot> for Watchlist {
    type Error = ValidationError;

    fn try_from(value: WatchlistSnapshot) -> Result<Self, Self::Error> {
        let mut watchlist = Self::new(value.name, value.symbols)?;
        watchlist.created_at = value.created_at;
        watchlist.updated_at = value.updated_at.unwrap_or(value.created_at);
        Ok(watchlist)
    }
}

impl Watchlist {
    /// Build a watchlist, rejecting repeated raw symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<Symbol>) -> Result<Self, ValidationError> {
        let name = validate_name(name.into())?;

        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(ValidationError::DuplicateSymbol {
                    symbol: symbol.to_string(),
                });
            }
        }

        let now = UtcDateTime::now();
        Ok(Self {
            name,
            symbols,
            created_at: now,
            updated_at: now,
        })
    }

    /// Build a watchlist from exchange-listing output.
    ///
    /// Blank entries and repeats are dropped with a warning instead of
    /// failing, since the listing is third-party data.
    pub fn from_listing<I, S>(name: impl Into<String>, raw_symbols: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = validate_name(name.into())?;
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();

        for raw in raw_symbols {
            let raw = raw.as_ref();
            match Symbol::parse(raw) {
                Ok(symbol) => {
                    if seen.insert(symbol.as_str().to_owned()) {
                        symbols.push(symbol);
                    } else {
                        tracing::warn!(symbol = %symbol, "dropping repeated listing symbol");
                    }
                }
                Err(error) => {
                    tracing::warn!(raw = %raw.escape_debug(), %error, "dropping invalid listing symbol");
                }
            }
        }

        let now = UtcDateTime::now();
        Ok(Self {
            name,
            symbols,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn created_at(&self) -> UtcDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> UtcDateTime {
        self.updated_at
    }
}

fn validate_name(name: String) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyWatchlistName);
    }
    Ok(trimmed.to_owned())
}

/// One row of live screener data. Numeric fields are `None` when the feed
/// sent null or a non-finite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRecord {
    pub symbol: Symbol,
    pub change_percent: Option<f64>,
    pub price: Option<f64>,
    pub volume: Option<f64>,
}

impl ScreenerRecord {
    pub fn new(
        symbol: Symbol,
        change_percent: Option<f64>,
        price: Option<f64>,
        volume: Option<f64>,
    ) -> Self {
        Self {
            symbol,
            change_percent: change_percent.filter(|value| value.is_finite()),
            price: price.filter(|value| value.is_finite()),
            volume: volume.filter(|value| value.is_finite()),
        }
    }
}

/// A watchlist symbol paired with the screener record it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedEntry {
    /// Symbol exactly as the watchlist spelled it.
    pub symbol: Symbol,
    pub key: NormalizedKey,
    pub record: ScreenerRecord,
}

/// Externally consumed output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighChangeResult {
    pub symbol: String,
    pub change_percent: f64,
    pub price: f64,
    pub volume: f64,
}

impl HighChangeResult {
    /// Returns `None` when the entry has no usable change value.
    pub fn from_entry(entry: &MatchedEntry) -> Option<Self> {
        let change_percent = entry.record.change_percent?;

        Some(Self {
            symbol: entry.symbol.to_string(),
            change_percent,
            price: sanitize_measure("price", entry, entry.record.price),
            volume: sanitize_measure("volume", entry, entry.record.volume),
        })
    }
}

fn sanitize_measure(field: &'static str, entry: &MatchedEntry, value: Option<f64>) -> f64 {
    match value {
        Some(value) if value.is_finite() && value >= 0.0 => value,
        other => {
            tracing::debug!(symbol = %entry.symbol, field, value = ?other, "invalid {field}, using 0");
            0.0
        }
    }
}

/// Two screener rows that normalized to the same key; the later one is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCollision {
    pub key: NormalizedKey,
    pub discarded_symbol: Symbol,
    pub kept_symbol: Symbol,
}

/// Diagnostic accounting for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total_symbols: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub unmatched_symbols: Vec<Symbol>,
    pub qualifying: usize,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_change_symbols: Vec<Symbol>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extreme_change_symbols: Vec<Symbol>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<KeyCollision>,
}

impl ProcessingStats {
    /// Stats for a run that had nothing to process.
    pub fn empty(threshold: f64) -> Self {
        Self {
            total_symbols: 0,
            matched: 0,
            unmatched: 0,
            unmatched_symbols: Vec::new(),
            qualifying: 0,
            threshold,
            missing_change_symbols: Vec::new(),
            extreme_change_symbols: Vec::new(),
            collisions: Vec::new(),
        }
    }

    /// Stats for a run whose screener fetch failed: every symbol is unmatched.
    pub fn all_unmatched(watchlist: &Watchlist, threshold: f64) -> Self {
        Self {
            total_symbols: watchlist.len(),
            unmatched: watchlist.len(),
            unmatched_symbols: watchlist.symbols().to_vec(),
            ..Self::empty(threshold)
        }
    }
}
