use thiserror::Error;

/// Validation and contract errors exposed by `tvscan-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol '{value}' contains a line break")]
    SymbolContainsLineBreak { value: String },

    #[error("watchlist name cannot be empty")]
    EmptyWatchlistName,
    #[error("watchlist already contains symbol '{symbol}'")]
    DuplicateSymbol { symbol: String },

    #[error("change threshold must be finite, got {value}")]
    NonFiniteThreshold { value: f64 },
    #[error("change threshold must be non-negative, got {value}")]
    NegativeThreshold { value: f64 },
    #[error("change ceiling {ceiling} must be finite and not below threshold {threshold}")]
    InvalidCeiling { ceiling: f64, threshold: f64 },

    #[error("exchange name must be non-empty ASCII alphanumeric: '{value}'")]
    InvalidExchange { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Writer(#[from] crate::writer::WriterError),
}
