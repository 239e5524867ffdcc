use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Interval, UtcDateTime, ValidationError};

/// Number of decimal places prices are fixed to at ingestion.
pub const PRICE_PRECISION: u32 = 4;

/// Validate and normalize a probability-style price into [0, 1] at 4 dp.
pub fn validate_price(value: Decimal) -> Result<Decimal, ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValidationError::PriceOutOfRange { value });
    }
    Ok(value.round_dp(PRICE_PRECISION))
}

/// A single observed price at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: UtcDateTime,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: UtcDateTime, price: Decimal) -> Result<Self, ValidationError> {
        Ok(Self {
            timestamp,
            price: validate_price(price)?,
        })
    }
}

/// Complete price history for one outcome of a market.
///
/// Points are strictly ascending in time. Duplicate timestamps are merged
/// at ingestion with last-write-wins; out-of-order input is sorted before
/// the merge, so only histories built via [`PriceHistory::from_points`]
/// uphold the invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub market_id: String,
    pub token_id: String,
    pub outcome: String,
    pub interval: Interval,
    points: Vec<PricePoint>,
}

impl PriceHistory {
    pub fn from_points(
        market_id: impl Into<String>,
        token_id: impl Into<String>,
        outcome: impl Into<String>,
        interval: Interval,
        mut points: Vec<PricePoint>,
    ) -> Self {
        points.sort_by_key(|point| point.timestamp);
        // Last write wins on duplicate timestamps.
        points.reverse();
        points.dedup_by_key(|point| point.timestamp);
        points.reverse();

        Self {
            market_id: market_id.into(),
            token_id: token_id.into(),
            outcome: outcome.into(),
            interval,
            points,
        }
    }

    /// Build a history from points that must already be strictly ascending.
    pub fn try_from_ordered(
        market_id: impl Into<String>,
        token_id: impl Into<String>,
        outcome: impl Into<String>,
        interval: Interval,
        points: Vec<PricePoint>,
    ) -> Result<Self, ValidationError> {
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ValidationError::NonMonotonicTimestamps { index: index + 1 });
            }
        }

        Ok(Self {
            market_id: market_id.into(),
            token_id: token_id.into(),
            outcome: outcome.into(),
            interval,
            points,
        })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest_price(&self) -> Option<Decimal> {
        self.points.last().map(|point| point.price)
    }

    pub fn oldest_price(&self) -> Option<Decimal> {
        self.points.first().map(|point| point.price)
    }

    pub fn price_change(&self) -> Option<Decimal> {
        match (self.oldest_price(), self.latest_price()) {
            (Some(oldest), Some(latest)) if self.points.len() >= 2 => Some(latest - oldest),
            _ => None,
        }
    }

    pub fn price_change_percent(&self) -> Option<Decimal> {
        let oldest = self.oldest_price()?;
        if oldest.is_zero() {
            return None;
        }
        self.price_change()
            .map(|change| (change / oldest * Decimal::ONE_HUNDRED).round_dp(PRICE_PRECISION))
    }
}
