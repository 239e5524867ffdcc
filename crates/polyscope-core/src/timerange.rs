//! Requested time windows and their adjustment to a market's lifetime.

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{Market, UtcDateTime, ValidationError};

/// Half-open request window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

impl TimeRange {
    pub fn new(start: UtcDateTime, end: UtcDateTime) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyTimeRange {
                start: start.unix_timestamp(),
                end: end.unix_timestamp(),
            });
        }
        Ok(Self { start, end })
    }

    /// The trailing `days` ending now.
    pub fn last_days(days: i64) -> Self {
        let end = UtcDateTime::now();
        Self {
            start: end.saturating_sub(Duration::days(days)),
            end,
        }
    }

    /// Clip the start to the market's creation so the provider is never
    /// asked for a window predating the market. The flag is informational;
    /// an adjusted range is not an error.
    pub fn clip_to_market(self, market: &Market) -> AdjustedRange {
        match market.start_date {
            Some(created) if created > self.start => AdjustedRange {
                range: TimeRange {
                    start: created,
                    end: self.end,
                },
                adjusted: true,
            },
            _ => AdjustedRange {
                range: self,
                adjusted: false,
            },
        }
    }
}

/// A request window after clipping, with a flag telling the caller whether
/// the effective range differs from what was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedRange {
    pub range: TimeRange,
    pub adjusted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(seconds: i64) -> UtcDateTime {
        UtcDateTime::from_unix_timestamp(seconds).expect("valid ts")
    }

    #[test]
    fn rejects_empty_window() {
        let err = TimeRange::new(ts(100), ts(100)).expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::EmptyTimeRange {
                start: 100,
                end: 100
            }
        );
    }

    #[test]
    fn younger_market_clips_start_and_flags_adjustment() {
        const DAY: i64 = 86_400;
        let market = Market {
            slug: String::from("new-market"),
            start_date: Some(ts(30 * DAY - 7 * DAY)),
            ..Market::default()
        };
        // 30-day request against a market created 7 days before the end.
        let requested = TimeRange::new(ts(0), ts(30 * DAY)).expect("valid range");

        let adjusted = requested.clip_to_market(&market);
        assert!(adjusted.adjusted);
        assert_eq!(adjusted.range.start, ts(23 * DAY));
        assert_eq!(adjusted.range.end, ts(30 * DAY));
    }

    #[test]
    fn older_market_leaves_range_untouched() {
        let market = Market {
            slug: String::from("old-market"),
            start_date: Some(ts(0)),
            ..Market::default()
        };
        let requested = TimeRange::new(ts(500), ts(1_000)).expect("valid range");

        let adjusted = requested.clip_to_market(&market);
        assert!(!adjusted.adjusted);
        assert_eq!(adjusted.range, requested);
    }

    #[test]
    fn unknown_creation_date_is_left_alone() {
        let market = Market::default();
        let requested = TimeRange::new(ts(500), ts(1_000)).expect("valid range");
        assert!(!requested.clip_to_market(&market).adjusted);
    }
}
