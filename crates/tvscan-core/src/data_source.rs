//! Collaborator contracts for the two external inputs of a run.
//!
//! | Trait | Request | Response | Description |
//! |-------|---------|----------|-------------|
//! | [`ListingSource`] | [`ListingRequest`] | `Vec<String>` | Exchange symbol listing |
//! | [`ScreenerSource`] | [`ScreenerRequest`] | `Vec<ScreenerRecord>` | Live change/price/volume rows |
//! | [`WatchlistSink`] | [`SyncRequest`] | [`SyncReport`] | Push a symbol list to an account watchlist |
//!
//! Implementations own transport concerns (auth, retry, backoff). They must
//! return either a complete batch or an explicit [`SourceError`], never a
//! partial list, so callers can tell "fetched zero rows" from "fetch failed".

use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::ScreenerRecord;

/// Boxed future returned by collaborator calls.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Unauthorized,
    InvalidRequest,
    InvalidResponse,
    Internal,
}

/// Structured fetch failure signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unauthorized,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Unauthorized => "source.unauthorized",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Session credential for the screener account.
///
/// Always passed explicitly; never read from process state by the core.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Returns `None` for blank input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for SessionCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

/// Which instruments an exchange listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    #[default]
    PerpetualFutures,
    Any,
}

/// Request payload for exchange listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub exchange: String,
    pub class: InstrumentClass,
}

impl ListingRequest {
    pub fn new(exchange: impl Into<String>, class: InstrumentClass) -> Result<Self, SourceError> {
        let exchange = exchange.into().trim().to_ascii_uppercase();
        if exchange.is_empty() {
            return Err(SourceError::invalid_request(
                "listing request must name an exchange",
            ));
        }
        Ok(Self { exchange, class })
    }
}

/// Request payload for screener batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenerRequest {
    pub exchange: String,
    pub session: Option<SessionCredential>,
    /// Restrict the batch to one of the account's named watchlists.
    pub watchlist: Option<String>,
}

impl ScreenerRequest {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into().trim().to_ascii_uppercase(),
            session: None,
            watchlist: None,
        }
    }

    pub fn with_session(mut self, session: Option<SessionCredential>) -> Self {
        self.session = session;
        self
    }

    pub fn with_watchlist(mut self, watchlist: Option<String>) -> Self {
        self.watchlist = watchlist;
        self
    }
}

/// Request to replace the contents of a named account watchlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub name: String,
    /// Prefix for symbols that carry none yet.
    pub exchange: String,
    pub symbols: Vec<String>,
    pub session: Option<SessionCredential>,
}

impl SyncRequest {
    pub fn new(
        name: impl Into<String>,
        exchange: impl Into<String>,
        symbols: Vec<String>,
    ) -> Result<Self, SourceError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(SourceError::invalid_request(
                "watchlist sync needs a list name",
            ));
        }
        Ok(Self {
            name,
            exchange: exchange.into().trim().to_ascii_uppercase(),
            symbols,
            session: None,
        })
    }

    pub fn with_session(mut self, session: Option<SessionCredential>) -> Self {
        self.session = session;
        self
    }
}

/// What a sync did to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub name: String,
    pub action: SyncAction,
    pub count: usize,
}

/// Exchange-listing collaborator.
///
/// Returns raw symbols in exchange order without duplicates.
pub trait ListingSource: Send + Sync {
    fn list_symbols<'a>(&'a self, req: &'a ListingRequest) -> SourceFuture<'a, Vec<String>>;
}

/// Screener-client collaborator.
pub trait ScreenerSource: Send + Sync {
    fn fetch_records<'a>(&'a self, req: &'a ScreenerRequest) -> SourceFuture<'a, Vec<ScreenerRecord>>;
}

/// Account-watchlist collaborator.
///
/// Replaces the symbols of the named list, creating it when the account has
/// none by that name.
pub trait WatchlistSink: Send + Sync {
    fn sync_watchlist<'a>(&'a self, req: &'a SyncRequest) -> SourceFuture<'a, SyncReport>;
}

/// In-memory source used for offline runs and tests.
///
/// Serves a fixed listing and screener batch, or a fixed failure for either.
/// Syncs are accepted and reported as created unless a sync failure is set.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    listing: Vec<String>,
    records: Vec<ScreenerRecord>,
    listing_error: Option<SourceError>,
    screener_error: Option<SourceError>,
    sync_error: Option<SourceError>,
}

impl StaticSource {
    pub fn new(listing: Vec<String>, records: Vec<ScreenerRecord>) -> Self {
        Self {
            listing,
            records,
            ..Self::default()
        }
    }

    pub fn failing_listing(mut self, error: SourceError) -> Self {
        self.listing_error = Some(error);
        self
    }

    pub fn failing_screener(mut self, error: SourceError) -> Self {
        self.screener_error = Some(error);
        self
    }

    pub fn failing_sync(mut self, error: SourceError) -> Self {
        self.sync_error = Some(error);
        self
    }
}

impl ListingSource for StaticSource {
    fn list_symbols<'a>(&'a self, _req: &'a ListingRequest) -> SourceFuture<'a, Vec<String>> {
        Box::pin(async move {
            match &self.listing_error {
                Some(error) => Err(error.clone()),
                None => Ok(self.listing.clone()),
            }
        })
    }
}

impl ScreenerSource for StaticSource {
    fn fetch_records<'a>(&'a self, _req: &'a ScreenerRequest) -> SourceFuture<'a, Vec<ScreenerRecord>> {
        Box::pin(async move {
            match &self.screener_error {
                Some(error) => Err(error.clone()),
                None => Ok(self.records.clone()),
            }
        })
    }
}

impl WatchlistSink for StaticSource {
    fn sync_watchlist<'a>(&'a self, req: &'a SyncRequest) -> SourceFuture<'a, SyncReport> {
        Box::pin(async move {
            match &self.sync_error {
                Some(error) => Err(error.clone()),
                None => Ok(SyncReport {
                    name: req.name.clone(),
                    action: SyncAction::Created,
                    count: req.symbols.len(),
                }),
            }
        })
    }
}
