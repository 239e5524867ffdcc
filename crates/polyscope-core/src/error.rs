use rust_decimal::Decimal;
use thiserror::Error;

/// Validation and data-integrity errors exposed by `polyscope-core`.
///
/// Integrity violations (price outside [0,1], non-monotonic history
/// timestamps) are surfaced here rather than silently corrected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid interval '{value}', expected one of 1m, 1h, 6h, 1d, 1w, max")]
    InvalidInterval { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("price {value} is outside the valid range [0, 1]")]
    PriceOutOfRange { value: Decimal },
    #[error("level size {value} must be non-negative")]
    NegativeSize { value: Decimal },

    #[error("price history timestamps must be strictly ascending at index {index}")]
    NonMonotonicTimestamps { index: usize },

    #[error("market '{slug}' has {outcomes} outcomes but {token_ids} token ids")]
    TokenOutcomeMismatch {
        slug: String,
        outcomes: usize,
        token_ids: usize,
    },

    #[error("requested time range is empty: start {start} >= end {end}")]
    EmptyTimeRange { start: i64, end: i64 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
