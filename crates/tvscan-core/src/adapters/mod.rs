//! Network implementations of the listing and screener collaborators.

pub mod tradingview;

pub use tradingview::{TradingViewSource, DEFAULT_SCAN_URL, DEFAULT_WATCHLISTS_URL};
