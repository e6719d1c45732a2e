//! # Domain Models
//!
//! Canonical types shared by every pipeline stage.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Raw instrument identifier, format preserved |
//! | [`NormalizedKey`] | Canonical matching key |
//! | [`SymbolNormalizer`] | Raw symbol to key conversion |
//! | [`Watchlist`] | Ordered, duplicate-free symbol list |
//! | [`ScreenerRecord`] | Live change/price/volume row |
//! | [`MatchedEntry`] | Watchlist symbol joined to its screener row |
//! | [`HighChangeResult`] | Output row |
//! | [`ProcessingStats`] | Per-run diagnostics |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Every value is created fresh per run and never mutated by a later stage.

mod models;
mod normalize;
mod symbol;
mod timestamp;

pub use models::{
    HighChangeResult, KeyCollision, MatchedEntry, ProcessingStats, ScreenerRecord, Watchlist,
};
pub use normalize::{normalize, NormalizedKey, NormalizedSymbol, SymbolNormalizer, PERPETUAL_SUFFIX};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
