use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::data_source::{
    InstrumentClass, ListingRequest, ListingSource, ScreenerRequest, ScreenerSource,
    SessionCredential, SourceError, SourceFuture, SyncAction, SyncReport, SyncRequest,
    WatchlistSink,
};
use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::{send_with_retry, RetryConfig};
use crate::writer::SymbolListFormat;
use crate::{ScreenerRecord, Symbol, PERPETUAL_SUFFIX};

pub const DEFAULT_SCAN_URL: &str = "https://scanner.tradingview.com/crypto/scan";
pub const DEFAULT_WATCHLISTS_URL: &str = "https://www.tradingview.com/api/v1/watchlists/";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
const SCAN_RANGE_END: u32 = 2000;

/// Scan columns, in the order the response `d` arrays follow.
const SCREENER_COLUMNS: [&str; 4] = ["name", "close", "change", "volume"];

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    data: Vec<ScanRow>,
}

#[derive(Debug, Deserialize)]
struct ScanRow {
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    d: Vec<Value>,
}

impl ScanRow {
    /// Display name without exchange prefix, falling back to the full ticker.
    fn name(&self) -> Option<&str> {
        let raw = self
            .d
            .first()
            .and_then(Value::as_str)
            .or(self.s.as_deref())?;
        Some(raw.rsplit_once(':').map_or(raw, |(_, name)| name))
    }

    fn number(&self, column: usize) -> Option<f64> {
        self.d.get(column).and_then(Value::as_f64)
    }
}

#[derive(Debug, Deserialize)]
struct AccountWatchlist {
    #[serde(default)]
    id: Option<Value>,
    name: String,
    #[serde(default)]
    symbols: Vec<String>,
}

impl AccountWatchlist {
    fn id(&self) -> Option<String> {
        self.id.as_ref().and_then(watchlist_id)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedWatchlist {
    #[serde(default)]
    id: Option<Value>,
}

/// Ids arrive as numbers or strings depending on the account API version.
fn watchlist_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_owned()),
        _ => None,
    }
}

/// TradingView crypto scanner adapter.
///
/// Serves both the exchange listing (perpetual names on one exchange) and
/// the screener batch (change/price/volume per name). With a session
/// credential and a watchlist name, the screener scan is restricted to the
/// tickers of that account watchlist. With a session it also pushes symbol
/// lists back to the account's watchlists.
#[derive(Clone)]
pub struct TradingViewSource {
    http_client: Arc<dyn HttpClient>,
    scan_url: String,
    watchlists_url: String,
    retry: RetryConfig,
    timeout_ms: u64,
}

impl Default for TradingViewSource {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()))
    }
}

impl TradingViewSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            scan_url: String::from(DEFAULT_SCAN_URL),
            watchlists_url: String::from(DEFAULT_WATCHLISTS_URL),
            retry: RetryConfig::default(),
            timeout_ms: 15_000,
        }
    }

    pub fn with_endpoints(
        mut self,
        scan_url: impl Into<String>,
        watchlists_url: impl Into<String>,
    ) -> Self {
        self.scan_url = scan_url.into();
        self.watchlists_url = watchlists_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn decorate(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_header("user-agent", BROWSER_USER_AGENT)
            .with_header("referer", "https://www.tradingview.com/")
            .with_header("origin", "https://www.tradingview.com")
            .with_timeout_ms(self.timeout_ms)
    }

    async fn send(&self, request: HttpRequest, what: &str) -> Result<HttpResponse, SourceError> {
        let response = send_with_retry(self.http_client.as_ref(), self.decorate(request), &self.retry)
            .await
            .map_err(|error| transport_error(what, &error))?;

        if !response.is_success() {
            return Err(status_error(what, &response));
        }

        Ok(response)
    }

    async fn scan(&self, payload: Value) -> Result<ScanResponse, SourceError> {
        let body = serde_json::to_string(&payload)
            .map_err(|error| SourceError::internal(format!("failed to encode scan payload: {error}")))?;
        let response = self
            .send(HttpRequest::post_json(&self.scan_url, body), "screener")
            .await?;

        tracing::debug!(status = response.status, "screener response received");

        serde_json::from_str(&response.body).map_err(|error| {
            SourceError::invalid_response(format!("screener returned malformed JSON: {error}"))
        })
    }

    async fn account_watchlists(&self, session: &SessionCredential) -> Result<Vec<AccountWatchlist>, SourceError> {
        let request = HttpRequest::get(&self.watchlists_url)
            .with_auth(&HttpAuth::from_session(Some(session)));
        let response = self.send(request, "watchlists").await?;

        let watchlists: Vec<AccountWatchlist> = serde_json::from_str(&response.body).map_err(|error| {
            SourceError::invalid_response(format!("watchlists returned malformed JSON: {error}"))
        })?;
        tracing::info!(count = watchlists.len(), "found account watchlists");
        Ok(watchlists)
    }

    /// Resolve a named account watchlist to its full `EXCHANGE:SYMBOL` tickers.
    async fn watchlist_tickers(&self, req: &ScreenerRequest, name: &str) -> Result<Vec<String>, SourceError> {
        let Some(session) = req.session.as_ref() else {
            return Err(SourceError::unauthorized(format!(
                "watchlist '{name}' requested without a session credential"
            )));
        };

        self.account_watchlists(session)
            .await?
            .into_iter()
            .find(|watchlist| watchlist.name == name)
            .map(|watchlist| watchlist.symbols)
            .ok_or_else(|| SourceError::invalid_request(format!("account has no watchlist named '{name}'")))
    }

    fn symbols_url(&self, id: &str) -> String {
        format!("{}/{id}/symbols/", self.watchlists_url.trim_end_matches('/'))
    }

    async fn post_symbols(
        &self,
        id: &str,
        tickers: &[String],
        auth: &HttpAuth,
    ) -> Result<(), SourceError> {
        if tickers.is_empty() {
            return Ok(());
        }
        let body = json!({ "symbols": tickers }).to_string();
        let request = HttpRequest::post_json(self.symbols_url(id), body).with_auth(auth);
        self.send(request, "watchlist symbols").await?;
        Ok(())
    }

    async fn create_watchlist(&self, name: &str, auth: &HttpAuth) -> Result<String, SourceError> {
        let body = json!({ "name": name, "symbols": [] }).to_string();
        let request = HttpRequest::post_json(&self.watchlists_url, body).with_auth(auth);
        let response = self.send(request, "watchlist create").await?;

        let created: CreatedWatchlist = serde_json::from_str(&response.body).map_err(|error| {
            SourceError::invalid_response(format!("watchlist create returned malformed JSON: {error}"))
        })?;
        created.id.as_ref().and_then(watchlist_id).ok_or_else(|| {
            SourceError::invalid_response(format!("watchlist create for '{name}' returned no id"))
        })
    }
}

fn exchange_filter(exchange: &str) -> Value {
    json!([{ "left": "exchange", "operation": "equal", "right": exchange }])
}

fn scan_payload(filter: Value, tickers: Vec<String>, columns: &[&str]) -> Value {
    json!({
        "filter": filter,
        "options": { "lang": "en" },
        "symbols": { "query": { "types": [] }, "tickers": tickers },
        "columns": columns,
        "sort": { "sortBy": "volume", "sortOrder": "desc" },
        "range": [0, SCAN_RANGE_END],
    })
}

fn transport_error(what: &str, error: &HttpError) -> SourceError {
    if error.retryable() {
        SourceError::unavailable(format!("{what} transport error: {}", error.message()))
    } else {
        SourceError::internal(format!("{what} transport error: {}", error.message()))
    }
}

fn status_error(what: &str, response: &HttpResponse) -> SourceError {
    let message = format!(
        "{what} returned status {}: {}",
        response.status,
        response.body_preview()
    );
    match response.status {
        401 | 403 => SourceError::unauthorized(message),
        429 => SourceError::rate_limited(message),
        400..=499 => SourceError::invalid_request(message),
        _ => SourceError::unavailable(message),
    }
}

impl ListingSource for TradingViewSource {
    fn list_symbols<'a>(&'a self, req: &'a ListingRequest) -> SourceFuture<'a, Vec<String>> {
        Box::pin(async move {
            let payload = scan_payload(exchange_filter(&req.exchange), Vec::new(), &["name"]);
            let response = self.scan(payload).await?;

            let mut seen = HashSet::new();
            let symbols: Vec<String> = response
                .data
                .iter()
                .filter_map(ScanRow::name)
                .filter(|name| match req.class {
                    InstrumentClass::PerpetualFutures => name.ends_with(PERPETUAL_SUFFIX),
                    InstrumentClass::Any => true,
                })
                .filter(|name| seen.insert(name.to_string()))
                .map(str::to_owned)
                .collect();

            tracing::info!(
                exchange = %req.exchange,
                count = symbols.len(),
                "listed exchange symbols"
            );
            Ok(symbols)
        })
    }
}

impl ScreenerSource for TradingViewSource {
    fn fetch_records<'a>(&'a self, req: &'a ScreenerRequest) -> SourceFuture<'a, Vec<ScreenerRecord>> {
        Box::pin(async move {
            let payload = match req.watchlist.as_deref() {
                Some(name) => {
                    let tickers = self.watchlist_tickers(req, name).await?;
                    scan_payload(json!([]), tickers, &SCREENER_COLUMNS)
                }
                None => scan_payload(exchange_filter(&req.exchange), Vec::new(), &SCREENER_COLUMNS),
            };
            let response = self.scan(payload).await?;

            let mut invalid_rows = 0usize;
            let mut records = Vec::with_capacity(response.data.len());
            for row in &response.data {
                match row.name().map(Symbol::parse) {
                    Some(Ok(symbol)) => records.push(ScreenerRecord::new(
                        symbol,
                        row.number(2),
                        row.number(1),
                        row.number(3),
                    )),
                    _ => {
                        tracing::debug!(row = ?row, "skipping screener row without a usable name");
                        invalid_rows += 1;
                    }
                }
            }

            if invalid_rows > 0 {
                tracing::warn!(invalid_rows, "skipped invalid screener rows");
            }
            tracing::info!(count = records.len(), "retrieved screener records");
            Ok(records)
        })
    }
}

impl WatchlistSink for TradingViewSource {
    fn sync_watchlist<'a>(&'a self, req: &'a SyncRequest) -> SourceFuture<'a, SyncReport> {
        Box::pin(async move {
            let Some(session) = req.session.as_ref() else {
                return Err(SourceError::unauthorized(format!(
                    "sync to watchlist '{}' requested without a session credential",
                    req.name
                )));
            };
            let auth = HttpAuth::from_session(Some(session));
            let format = SymbolListFormat::with_exchange_prefix(&req.exchange);
            let tickers: Vec<String> = req
                .symbols
                .iter()
                .map(|symbol| format.render(symbol).into_owned())
                .collect();

            let existing = self
                .account_watchlists(session)
                .await?
                .into_iter()
                .find(|watchlist| watchlist.name == req.name);

            let action = match existing {
                Some(watchlist) => {
                    let id = watchlist.id().ok_or_else(|| {
                        SourceError::invalid_response(format!(
                            "watchlist '{}' has no id",
                            req.name
                        ))
                    })?;
                    let clear = HttpRequest::delete(self.symbols_url(&id)).with_auth(&auth);
                    self.send(clear, "watchlist clear").await?;
                    self.post_symbols(&id, &tickers, &auth).await?;
                    SyncAction::Updated
                }
                None => {
                    let id = self.create_watchlist(&req.name, &auth).await?;
                    self.post_symbols(&id, &tickers, &auth).await?;
                    SyncAction::Created
                }
            };

            tracing::info!(
                name = %req.name,
                action = ?action,
                count = tickers.len(),
                "synced account watchlist"
            );
            Ok(SyncReport {
                name: req.name.clone(),
                action,
                count: tickers.len(),
            })
        })
    }
}
