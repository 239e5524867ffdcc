//! Typed clients for the three upstream sources.
//!
//! Each client owns its provider's wire schema and translates responses
//! into the shared domain records; nothing above this layer ever sees
//! provider JSON shapes.

use std::fmt::{Display, Formatter};

use crate::transport::TransportError;

mod clob;
mod data;
mod gamma;

pub use clob::{ClobClient, HistoryQuery, MarketsPage};
pub use data::{
    ActivityQuery, ActivityRecord, DataClient, Holder, HoldingsPoint, Position, PositionQuery,
    TradeRecord,
};
pub use gamma::{GammaClient, ListQuery};

/// Source-level error classification used by router fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NotFound,
    Unavailable,
    RateLimited,
    InvalidRequest,
    Integrity,
    Internal,
}

/// Structured source error: a kind the router can branch on plus a human
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

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

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    /// Malformed or contradictory payload; surfaced, never repaired.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Integrity,
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
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Integrity => "source.integrity",
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

impl From<TransportError> for SourceError {
    fn from(err: TransportError) -> Self {
        match &err {
            TransportError::RetriesExhausted { .. } if err.is_rate_limited() => {
                Self::rate_limited(err.to_string())
            }
            TransportError::RetriesExhausted { .. } => Self::unavailable(err.to_string()),
            TransportError::Status { status: 404, .. } => Self::not_found("http status 404"),
            TransportError::Status { status, .. } => {
                Self::invalid_request(format!("http status {status}"))
            }
            TransportError::Network(_) => Self::internal(err.to_string()),
            // Malformed payloads are integrity failures, not infrastructure.
            TransportError::Decode { .. } => Self::integrity(err.to_string()),
        }
    }
}

/// Build `?a=1&b=2` from key/value pairs, percent-encoding values.
pub(crate) fn query_string(pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect();
    format!("?{}", encoded.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpError;
    use crate::transport::FailureCause;

    #[test]
    fn query_string_encodes_values() {
        let q = query_string(&[
            ("slug", String::from("will liverpool win")),
            ("limit", String::from("10")),
        ]);
        assert_eq!(q, "?slug=will%20liverpool%20win&limit=10");
    }

    #[test]
    fn empty_query_is_empty_string() {
        assert_eq!(query_string(&[]), "");
    }

    #[test]
    fn transport_errors_map_to_source_kinds() {
        let exhausted = TransportError::RetriesExhausted {
            attempts: 4,
            last: FailureCause::Network(HttpError::new("timeout")),
        };
        assert_eq!(
            SourceError::from(exhausted).kind(),
            SourceErrorKind::Unavailable
        );

        let rate_limited = TransportError::RetriesExhausted {
            attempts: 4,
            last: FailureCause::Status {
                status: 429,
                body: String::new(),
            },
        };
        assert_eq!(
            SourceError::from(rate_limited).kind(),
            SourceErrorKind::RateLimited
        );

        let missing = TransportError::Status {
            status: 404,
            body: String::new(),
        };
        assert_eq!(SourceError::from(missing).kind(), SourceErrorKind::NotFound);

        let bad_request = TransportError::Status {
            status: 400,
            body: String::new(),
        };
        assert_eq!(
            SourceError::from(bad_request).kind(),
            SourceErrorKind::InvalidRequest
        );

        let malformed = TransportError::Decode {
            url: String::from("https://example.test/markets"),
            message: String::from("expected value at line 1"),
        };
        assert_eq!(
            SourceError::from(malformed).kind(),
            SourceErrorKind::Integrity
        );
    }
}
