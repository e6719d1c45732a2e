//! Core engine for tvscan.
//!
//! This crate contains:
//! - Canonical domain models and symbol normalization
//! - The pure pipeline stages: index, reconcile, filter, rank
//! - Listing, screener and watchlist-sink traits and the TradingView adapter
//! - HTTP transport with retry and backoff
//! - The run orchestrator and symbol-list writers
//!
//! | Stage | Entry point |
//! |-------|-------------|
//! | Normalize | [`SymbolNormalizer::normalize`] |
//! | Index | [`ScreenerIndex::build`] |
//! | Reconcile | [`reconcile()`] |
//! | Filter | [`ChangeFilter::apply`] / [`filter()`] |
//! | Rank | [`RankedResultBuilder::build`] |
//! | Orchestrate | [`WatchlistBuilder::run`] |
//! | Sync | [`WatchlistSink::sync_watchlist`] |

pub mod adapters;
pub mod builder;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod filter;
pub mod http_client;
pub mod index;
pub mod ranking;
pub mod reconcile;
pub mod retry;
pub mod writer;

pub use adapters::TradingViewSource;
pub use builder::{
    BuildConfig, RunOutcome, RunReport, RunStage, WatchlistBuilder, DEFAULT_EXCHANGE,
};
pub use data_source::{
    InstrumentClass, ListingRequest, ListingSource, ScreenerRequest, ScreenerSource,
    SessionCredential, SourceError, SourceErrorKind, SourceFuture, StaticSource, SyncAction,
    SyncReport, SyncRequest, WatchlistSink,
};
pub use domain::{
    normalize, HighChangeResult, KeyCollision, MatchedEntry, NormalizedKey, NormalizedSymbol,
    ProcessingStats, ScreenerRecord, Symbol, SymbolNormalizer, UtcDateTime, Watchlist,
    PERPETUAL_SUFFIX,
};
pub use error::{CoreError, ValidationError};
pub use filter::{
    filter, ChangeFilter, ChangeThreshold, FilterOutcome, DEFAULT_MAX_CHANGE_PERCENT,
    DEFAULT_MIN_CHANGE_PERCENT,
};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use index::ScreenerIndex;
pub use ranking::{RankedReport, RankedResultBuilder};
pub use reconcile::{reconcile, Reconciliation};
pub use retry::{send_with_retry, Backoff, RetryConfig};
pub use writer::{
    load_watchlist_json, save_watchlist_json, write_symbol_file, write_symbol_list, ListHeader,
    SymbolListFormat, WriterError,
};
