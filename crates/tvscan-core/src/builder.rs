//! Run orchestration: fetch, index, reconcile, filter, rank.
//!
//! One call to [`WatchlistBuilder::run`] is one linear pass through
//! [`RunStage`]. Only the two fetch stages touch the network, and a failure
//! in either ends the run with an empty result and a failed [`RunOutcome`]
//! instead of an error. Every later stage is a total function over
//! in-memory data.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use crate::data_source::{
    InstrumentClass, ListingRequest, ListingSource, ScreenerRequest, ScreenerSource,
    SessionCredential, SourceError,
};
use crate::filter::{ChangeFilter, ChangeThreshold};
use crate::index::ScreenerIndex;
use crate::ranking::RankedResultBuilder;
use crate::reconcile::reconcile;
use crate::{HighChangeResult, ProcessingStats, SymbolNormalizer, ValidationError, Watchlist};

pub const DEFAULT_EXCHANGE: &str = "BLOFIN";

/// Explicit parameter set for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    filter: ChangeFilter,
    exchange: String,
    watchlist_name: Option<String>,
    session: Option<SessionCredential>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(ChangeThreshold::DEFAULT)
    }
}

impl BuildConfig {
    pub fn new(threshold: ChangeThreshold) -> Self {
        Self {
            filter: ChangeFilter::new(threshold),
            exchange: String::from(DEFAULT_EXCHANGE),
            watchlist_name: None,
            session: None,
        }
    }

    /// Sanity ceiling on `|change|`; `None` disables it.
    pub fn with_ceiling(mut self, ceiling: Option<f64>) -> Result<Self, ValidationError> {
        self.filter = self.filter.with_ceiling(ceiling)?;
        Ok(self)
    }

    pub fn with_exchange(mut self, exchange: &str) -> Result<Self, ValidationError> {
        let normalized = exchange.trim().to_ascii_uppercase();
        if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidExchange {
                value: exchange.to_owned(),
            });
        }
        self.exchange = normalized;
        Ok(self)
    }

    /// Restrict the screener batch to one of the account's named watchlists.
    pub fn with_watchlist_name(mut self, name: Option<String>) -> Result<Self, ValidationError> {
        self.watchlist_name = match name {
            Some(name) if name.trim().is_empty() => return Err(ValidationError::EmptyWatchlistName),
            Some(name) => Some(name.trim().to_owned()),
            None => None,
        };
        Ok(self)
    }

    pub fn with_session(mut self, session: Option<SessionCredential>) -> Self {
        self.session = session;
        self
    }

    pub const fn threshold(&self) -> ChangeThreshold {
        self.filter.threshold()
    }

    pub const fn ceiling(&self) -> Option<f64> {
        self.filter.ceiling()
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn watchlist_name(&self) -> Option<&str> {
        self.watchlist_name.as_deref()
    }

    pub fn session(&self) -> Option<&SessionCredential> {
        self.session.as_ref()
    }

    pub const fn change_filter(&self) -> ChangeFilter {
        self.filter
    }

    fn listing_name(&self) -> String {
        format!("{} perpetuals", self.exchange)
    }
}

/// Pipeline state machine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Start,
    FetchWatchlist,
    FetchScreener,
    Index,
    Reconcile,
    Filter,
    Rank,
    Done,
    Failed,
}

impl RunStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchWatchlist => "fetch_watchlist",
            Self::FetchScreener => "fetch_screener",
            Self::Index => "index",
            Self::Reconcile => "reconcile",
            Self::Filter => "filter",
            Self::Rank => "rank",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// How a run ended. The two `*Failed` variants are the failed terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    EmptyWatchlist,
    ListingFailed { code: String, message: String },
    ScreenerFailed { code: String, message: String },
}

impl RunOutcome {
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::ListingFailed { .. } | Self::ScreenerFailed { .. })
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::EmptyWatchlist => "empty_watchlist",
            Self::ListingFailed { .. } => "listing_failed",
            Self::ScreenerFailed { .. } => "screener_failed",
        }
    }

    fn listing_failed(error: &SourceError) -> Self {
        Self::ListingFailed {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
        }
    }

    fn screener_failed(error: &SourceError) -> Self {
        Self::ScreenerFailed {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
        }
    }
}

/// Ranked results, stats and outcome of one run. Always produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub watchlist_name: String,
    pub results: Vec<HighChangeResult>,
    pub stats: ProcessingStats,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn empty(watchlist_name: String, threshold: f64, outcome: RunOutcome) -> Self {
        Self {
            watchlist_name,
            results: Vec::new(),
            stats: ProcessingStats::empty(threshold),
            outcome,
        }
    }

    /// The `n` largest movers.
    pub fn top(&self, n: usize) -> &[HighChangeResult] {
        &self.results[..n.min(self.results.len())]
    }
}

/// Composes the listing and screener collaborators with the pure stages.
#[derive(Clone)]
pub struct WatchlistBuilder {
    listing: Arc<dyn ListingSource>,
    screener: Arc<dyn ScreenerSource>,
    normalizer: SymbolNormalizer,
}

impl WatchlistBuilder {
    pub fn new(listing: Arc<dyn ListingSource>, screener: Arc<dyn ScreenerSource>) -> Self {
        Self {
            listing,
            screener,
            normalizer: SymbolNormalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: SymbolNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn normalizer(&self) -> &SymbolNormalizer {
        &self.normalizer
    }

    /// Run the pipeline. A supplied `watchlist` skips the listing fetch.
    pub async fn run(&self, config: &BuildConfig, watchlist: Option<Watchlist>) -> RunReport {
        let span = tracing::info_span!(
            "run",
            exchange = %config.exchange,
            threshold = config.threshold().value(),
            watchlist = config.watchlist_name().unwrap_or("-"),
        );
        self.run_stages(config, watchlist).instrument(span).await
    }

    async fn run_stages(&self, config: &BuildConfig, watchlist: Option<Watchlist>) -> RunReport {
        let threshold = config.threshold();
        enter(RunStage::Start);

        let watchlist = match watchlist {
            Some(watchlist) => {
                tracing::debug!(name = watchlist.name(), "using supplied watchlist, skipping listing fetch");
                watchlist
            }
            None => {
                enter(RunStage::FetchWatchlist);
                match self.fetch_watchlist(config).await {
                    Ok(watchlist) => watchlist,
                    Err(error) => {
                        tracing::error!(code = error.code(), %error, "exchange listing fetch failed");
                        enter(RunStage::Failed);
                        return RunReport::empty(
                            config.listing_name(),
                            threshold.value(),
                            RunOutcome::listing_failed(&error),
                        );
                    }
                }
            }
        };

        if watchlist.is_empty() {
            tracing::warn!(name = watchlist.name(), "watchlist is empty, nothing to screen");
            enter(RunStage::Done);
            return RunReport::empty(
                watchlist.name().to_owned(),
                threshold.value(),
                RunOutcome::EmptyWatchlist,
            );
        }

        enter(RunStage::FetchScreener);
        let request = ScreenerRequest::new(config.exchange())
            .with_session(config.session.clone())
            .with_watchlist(config.watchlist_name.clone());
        let records = match self.screener.fetch_records(&request).await {
            Ok(records) => records,
            Err(error) => {
                tracing::error!(
                    code = error.code(),
                    %error,
                    symbols = watchlist.len(),
                    "screener fetch failed, reporting every symbol as unmatched"
                );
                enter(RunStage::Failed);
                return RunReport {
                    watchlist_name: watchlist.name().to_owned(),
                    results: Vec::new(),
                    stats: ProcessingStats::all_unmatched(&watchlist, threshold.value()),
                    outcome: RunOutcome::screener_failed(&error),
                };
            }
        };
        if records.is_empty() {
            tracing::warn!("screener returned no rows");
        }

        enter(RunStage::Index);
        let index = ScreenerIndex::build(records, &self.normalizer);

        enter(RunStage::Reconcile);
        let reconciliation = reconcile(&watchlist, &index, &self.normalizer);

        enter(RunStage::Filter);
        let filtered = config.change_filter().apply(&reconciliation.matched);

        enter(RunStage::Rank);
        let report = RankedResultBuilder::new(threshold)
            .with_collisions(index.collisions().to_vec())
            .with_filter_diagnostics(filtered.missing_change, filtered.extreme_change)
            .build(
                &filtered.retained,
                &reconciliation.matched,
                &reconciliation.unmatched,
            );

        enter(RunStage::Done);
        RunReport {
            watchlist_name: watchlist.name().to_owned(),
            results: report.results,
            stats: report.stats,
            outcome: RunOutcome::Completed,
        }
    }

    async fn fetch_watchlist(&self, config: &BuildConfig) -> Result<Watchlist, SourceError> {
        let request = ListingRequest::new(config.exchange(), InstrumentClass::PerpetualFutures)?;
        let raw_symbols = self.listing.list_symbols(&request).await?;
        tracing::info!(count = raw_symbols.len(), "fetched exchange listing");

        Watchlist::from_listing(config.listing_name(), raw_symbols)
            .map_err(|error| SourceError::invalid_response(error.to_string()))
    }
}

fn enter(stage: RunStage) {
    tracing::debug!(stage = stage.as_str(), "entering stage");
}
