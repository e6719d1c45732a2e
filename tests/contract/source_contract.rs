use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tvscan_core::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, InstrumentClass, ListingRequest,
    ListingSource, RetryConfig, ScreenerRequest, ScreenerSource, SessionCredential,
    SourceErrorKind, SyncAction, SyncRequest, TradingViewSource, WatchlistSink,
};

const SCAN_URL: &str = "https://scanner.test/crypto/scan";
const WATCHLISTS_URL: &str = "https://tv.test/api/v1/watchlists/";

/// Replays canned responses in order and keeps every request it saw.
struct ScriptedHttp {
    responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    fn new(mut responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        responses.reverse();
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }

    fn body(&self, index: usize) -> Value {
        let requests = self.requests();
        let body = requests[index].body.as_deref().expect("request body");
        serde_json::from_str(body).expect("json body")
    }
}

impl HttpClient for ScriptedHttp {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("lock").push(request);
        let next = self
            .responses
            .lock()
            .expect("lock")
            .pop()
            .unwrap_or_else(|| Err(HttpError::non_retryable("script exhausted")));
        Box::pin(async move { next })
    }
}

fn source(http: &Arc<ScriptedHttp>) -> TradingViewSource {
    TradingViewSource::new(http.clone())
        .with_endpoints(SCAN_URL, WATCHLISTS_URL)
        .with_retry(RetryConfig::fixed(Duration::from_millis(1), 2))
}

fn ok(body: Value) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok_json(body.to_string()))
}

fn listing_request() -> ListingRequest {
    ListingRequest::new("blofin", InstrumentClass::PerpetualFutures).expect("valid")
}

#[tokio::test]
async fn listing_keeps_perpetuals_strips_prefix_and_deduplicates() {
    let http = ScriptedHttp::new(vec![ok(json!({
        "totalCount": 5,
        "data": [
            { "s": "BLOFIN:BTCUSDT.P", "d": ["BTCUSDT.P"] },
            { "s": "BLOFIN:BTCUSDT", "d": ["BTCUSDT"] },
            { "s": "BLOFIN:ETHUSDT.P", "d": ["BLOFIN:ETHUSDT.P"] },
            { "s": "BLOFIN:BTCUSDT.P", "d": ["BTCUSDT.P"] },
            { "s": "BLOFIN:SOLUSDT.P", "d": [] }
        ]
    }))]);

    let symbols = source(&http)
        .list_symbols(&listing_request())
        .await
        .expect("listing succeeds");

    assert_eq!(symbols, vec!["BTCUSDT.P", "ETHUSDT.P", "SOLUSDT.P"]);

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].url, SCAN_URL);
    let body = http.body(0);
    assert_eq!(body["filter"][0]["left"], "exchange");
    assert_eq!(body["filter"][0]["right"], "BLOFIN");
}

#[tokio::test]
async fn screener_maps_columns_and_treats_nulls_as_missing() {
    let http = ScriptedHttp::new(vec![ok(json!({
        "data": [
            { "s": "BLOFIN:AUSDT.P", "d": ["AUSDT.P", 1.5, 12.0, 1000] },
            { "s": "BLOFIN:BUSDT.P", "d": ["BUSDT.P", null, null, null] },
            { "s": "BLOFIN:CUSDT.P", "d": [null] },
            { "d": [] }
        ]
    }))]);

    let records = source(&http)
        .fetch_records(&ScreenerRequest::new("BLOFIN"))
        .await
        .expect("screener succeeds");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].symbol.as_str(), "AUSDT.P");
    assert_eq!(records[0].price, Some(1.5));
    assert_eq!(records[0].change_percent, Some(12.0));
    assert_eq!(records[0].volume, Some(1000.0));
    assert_eq!(records[1].change_percent, None);
    assert_eq!(records[2].symbol.as_str(), "CUSDT.P");

    let body = http.body(0);
    assert_eq!(
        body["columns"],
        json!(["name", "close", "change", "volume"])
    );
    assert!(!http.requests()[0].headers.contains_key("cookie"));
}

#[tokio::test]
async fn screener_with_named_watchlist_scans_only_its_tickers() {
    let http = ScriptedHttp::new(vec![
        ok(json!([
            { "id": 1, "name": "Majors", "symbols": ["BLOFIN:BTCUSDT.P"] },
            { "id": 2, "name": "Perps", "symbols": ["BLOFIN:AUSDT.P", "BLOFIN:BUSDT.P"] }
        ])),
        ok(json!({ "data": [{ "s": "BLOFIN:AUSDT.P", "d": ["AUSDT.P", 1.0, 7.0, 5.0] }] })),
    ]);
    let request = ScreenerRequest::new("BLOFIN")
        .with_session(SessionCredential::new("abc"))
        .with_watchlist(Some(String::from("Perps")));

    let records = source(&http)
        .fetch_records(&request)
        .await
        .expect("screener succeeds");

    assert_eq!(records.len(), 1);
    let requests = http.requests();
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, WATCHLISTS_URL);
    assert_eq!(
        requests[0].headers.get("cookie").map(String::as_str),
        Some("sessionid=abc")
    );
    let body = http.body(1);
    assert_eq!(
        body["symbols"]["tickers"],
        json!(["BLOFIN:AUSDT.P", "BLOFIN:BUSDT.P"])
    );
}

#[tokio::test]
async fn unknown_watchlist_name_is_an_invalid_request() {
    let http = ScriptedHttp::new(vec![ok(json!([{ "id": 1, "name": "Majors", "symbols": [] }]))]);
    let request = ScreenerRequest::new("BLOFIN")
        .with_session(SessionCredential::new("abc"))
        .with_watchlist(Some(String::from("Missing")));

    let error = source(&http)
        .fetch_records(&request)
        .await
        .expect_err("unknown name");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn named_watchlist_without_session_is_unauthorized_before_any_request() {
    let http = ScriptedHttp::new(Vec::new());
    let request = ScreenerRequest::new("BLOFIN").with_watchlist(Some(String::from("Perps")));

    let error = source(&http)
        .fetch_records(&request)
        .await
        .expect_err("session required");

    assert_eq!(error.kind(), SourceErrorKind::Unauthorized);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn rate_limits_are_retried_then_reported() {
    let http = ScriptedHttp::new(vec![
        Ok(HttpResponse::with_status(429, "Too Many Requests")),
        Ok(HttpResponse::with_status(429, "Too Many Requests")),
        Ok(HttpResponse::with_status(429, "Too Many Requests")),
    ]);

    let error = source(&http)
        .fetch_records(&ScreenerRequest::new("BLOFIN"))
        .await
        .expect_err("rate limited");

    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    assert!(error.retryable());
    assert_eq!(http.requests().len(), 3);
}

#[tokio::test]
async fn transient_failure_recovers_into_a_complete_batch() {
    let http = ScriptedHttp::new(vec![
        Err(HttpError::new("connection reset")),
        Ok(HttpResponse::with_status(503, "")),
        ok(json!({ "data": [{ "d": ["AUSDT.P", 1.0, 6.0, 2.0] }] })),
    ]);

    let records = source(&http)
        .fetch_records(&ScreenerRequest::new("BLOFIN"))
        .await
        .expect("third attempt succeeds");

    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn error_statuses_and_bad_payloads_become_explicit_failures() {
    let cases = vec![
        (Ok(HttpResponse::with_status(403, "forbidden")), SourceErrorKind::Unauthorized),
        (Ok(HttpResponse::with_status(400, "bad")), SourceErrorKind::InvalidRequest),
        (Ok(HttpResponse::ok_json("<html>")), SourceErrorKind::InvalidResponse),
        (
            Err(HttpError::non_retryable("invalid url")),
            SourceErrorKind::Internal,
        ),
    ];

    for (response, expected) in cases {
        let http = ScriptedHttp::new(vec![response]);
        let error = source(&http)
            .list_symbols(&listing_request())
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), expected, "{error}");
    }
}

#[tokio::test]
async fn empty_scan_is_a_successful_empty_batch() {
    let http = ScriptedHttp::new(vec![ok(json!({ "totalCount": 0, "data": [] }))]);

    let records = source(&http)
        .fetch_records(&ScreenerRequest::new("BLOFIN"))
        .await
        .expect("empty is not a failure");

    assert!(records.is_empty());
}

fn sync_request(name: &str, symbols: &[&str]) -> SyncRequest {
    SyncRequest::new(name, "blofin", symbols.iter().map(|s| (*s).to_owned()).collect())
        .expect("valid sync request")
        .with_session(SessionCredential::new("abc"))
}

#[tokio::test]
async fn sync_to_an_existing_list_clears_then_adds_prefixed_tickers() {
    let http = ScriptedHttp::new(vec![
        ok(json!([
            { "id": 11, "name": "Majors", "symbols": [] },
            { "id": 12, "name": "Movers", "symbols": ["BLOFIN:OLDUSDT.P"] }
        ])),
        ok(json!({})),
        ok(json!({})),
    ]);

    let report = source(&http)
        .sync_watchlist(&sync_request("Movers", &["SOLUSDT.P", "BYBIT:ETHUSDT.P"]))
        .await
        .expect("sync succeeds");

    assert_eq!(report.action, SyncAction::Updated);
    assert_eq!(report.count, 2);

    let requests = http.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[1].method, HttpMethod::Delete);
    assert_eq!(requests[1].url, "https://tv.test/api/v1/watchlists/12/symbols/");
    assert_eq!(requests[2].method, HttpMethod::Post);
    assert_eq!(requests[2].url, "https://tv.test/api/v1/watchlists/12/symbols/");
    assert!(requests
        .iter()
        .all(|r| r.headers.get("cookie").map(String::as_str) == Some("sessionid=abc")));
    assert_eq!(
        http.body(2)["symbols"],
        json!(["BLOFIN:SOLUSDT.P", "BYBIT:ETHUSDT.P"])
    );
}

#[tokio::test]
async fn sync_to_a_missing_list_creates_it_then_adds_tickers() {
    let http = ScriptedHttp::new(vec![
        ok(json!([{ "id": 11, "name": "Majors", "symbols": [] }])),
        ok(json!({ "id": "wl-9", "name": "Movers" })),
        ok(json!({})),
    ]);

    let report = source(&http)
        .sync_watchlist(&sync_request("Movers", &["SOLUSDT.P"]))
        .await
        .expect("sync succeeds");

    assert_eq!(report.action, SyncAction::Created);
    let requests = http.requests();
    assert_eq!(requests[1].method, HttpMethod::Post);
    assert_eq!(requests[1].url, WATCHLISTS_URL);
    assert_eq!(http.body(1), json!({ "name": "Movers", "symbols": [] }));
    assert_eq!(requests[2].url, "https://tv.test/api/v1/watchlists/wl-9/symbols/");
    assert_eq!(http.body(2)["symbols"], json!(["BLOFIN:SOLUSDT.P"]));
}

#[tokio::test]
async fn sync_of_an_empty_list_only_clears_it() {
    let http = ScriptedHttp::new(vec![
        ok(json!([{ "id": 12, "name": "Movers", "symbols": ["BLOFIN:OLDUSDT.P"] }])),
        ok(json!({})),
    ]);

    let report = source(&http)
        .sync_watchlist(&sync_request("Movers", &[]))
        .await
        .expect("sync succeeds");

    assert_eq!(report.count, 0);
    assert_eq!(http.requests().len(), 2);
    assert_eq!(http.requests()[1].method, HttpMethod::Delete);
}

#[tokio::test]
async fn sync_without_session_is_unauthorized_before_any_request() {
    let http = ScriptedHttp::new(Vec::new());
    let request = SyncRequest::new("Movers", "BLOFIN", vec![String::from("AUSDT.P")])
        .expect("valid sync request");

    let error = source(&http)
        .sync_watchlist(&request)
        .await
        .expect_err("session required");

    assert_eq!(error.kind(), SourceErrorKind::Unauthorized);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn sync_create_without_an_id_is_an_invalid_response() {
    let http = ScriptedHttp::new(vec![ok(json!([])), ok(json!({ "name": "Movers" }))]);

    let error = source(&http)
        .sync_watchlist(&sync_request("Movers", &["AUSDT.P"]))
        .await
        .expect_err("no id");

    assert_eq!(error.kind(), SourceErrorKind::InvalidResponse);
    assert_eq!(http.requests().len(), 2);
}

#[tokio::test]
async fn sync_rejected_by_the_account_maps_to_unauthorized() {
    let http = ScriptedHttp::new(vec![Ok(HttpResponse::with_status(401, "expired"))]);

    let error = source(&http)
        .sync_watchlist(&sync_request("Movers", &["AUSDT.P"]))
        .await
        .expect_err("expired session");

    assert_eq!(error.kind(), SourceErrorKind::Unauthorized);
}
