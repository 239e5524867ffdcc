//! Order book models and analytics.
//!
//! Books are ephemeral snapshots: one per fetch, validated at construction
//! and never mutated afterwards. All arithmetic is `Decimal`; prices and
//! sizes never touch binary floating point.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{UtcDateTime, ValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("crossed book: best bid {best_bid} >= best ask {best_ask}")]
    Crossed {
        best_bid: Decimal,
        best_ask: Decimal,
    },

    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: Decimal,
        available: Decimal,
    },
}

/// Which side of the book an order consumes liquidity from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// A single price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl OrderLevel {
    pub fn new(price: Decimal, size: Decimal) -> Result<Self, ValidationError> {
        if price <= Decimal::ZERO || price >= Decimal::ONE {
            return Err(ValidationError::PriceOutOfRange { value: price });
        }
        if size < Decimal::ZERO {
            return Err(ValidationError::NegativeSize { value: size });
        }
        Ok(Self { price, size })
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// Result of simulating an order of a given size against one side of the
/// book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub average_price: Decimal,
    pub total_cost: Decimal,
    /// Relative to the mid price, positive when the fill is worse than mid.
    /// Absent when the opposite side is empty and no mid exists.
    pub slippage_percent: Option<Decimal>,
    pub levels_consumed: usize,
}

/// Order book for one outcome of a market.
///
/// Invariants established at construction: bids sorted descending, asks
/// ascending, and `best_bid < best_ask` when both sides are non-empty.
/// Crossed input is rejected, not repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub market_id: String,
    pub token_id: String,
    pub outcome: String,
    bids: Vec<OrderLevel>,
    asks: Vec<OrderLevel>,
    pub fetched_at: UtcDateTime,
}

impl OrderBook {
    /// Build a book from unsorted wire levels.
    pub fn new(
        market_id: impl Into<String>,
        token_id: impl Into<String>,
        outcome: impl Into<String>,
        mut bids: Vec<OrderLevel>,
        mut asks: Vec<OrderLevel>,
        fetched_at: UtcDateTime,
    ) -> Result<Self, BookError> {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        if let (Some(bid), Some(ask)) = (bids.first(), asks.first()) {
            if bid.price >= ask.price {
                return Err(BookError::Crossed {
                    best_bid: bid.price,
                    best_ask: ask.price,
                });
            }
        }

        Ok(Self {
            market_id: market_id.into(),
            token_id: token_id.into(),
            outcome: outcome.into(),
            bids,
            asks,
            fetched_at,
        })
    }

    pub fn bids(&self) -> &[OrderLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[OrderLevel] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<&OrderLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderLevel> {
        self.asks.first()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    pub fn spread_percent(&self) -> Option<Decimal> {
        let mid = self.mid_price()?;
        if mid.is_zero() {
            return None;
        }
        self.spread()
            .map(|spread| spread / mid * Decimal::ONE_HUNDRED)
    }

    /// Top `levels` entries of each side.
    pub fn depth(&self, levels: usize) -> (&[OrderLevel], &[OrderLevel]) {
        (
            &self.bids[..levels.min(self.bids.len())],
            &self.asks[..levels.min(self.asks.len())],
        )
    }

    /// Running sum of sizes at or better than `price_limit`, walking the
    /// side in priority order. "Better" is higher for bids, lower for asks.
    pub fn cumulative_depth(&self, side: Side, price_limit: Decimal) -> Decimal {
        let within = |level: &&OrderLevel| match side {
            Side::Buy => level.price >= price_limit,
            Side::Sell => level.price <= price_limit,
        };
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels
            .iter()
            .take_while(within)
            .map(|level| level.size)
            .sum()
    }

    fn side_depth(levels: &[OrderLevel]) -> Decimal {
        levels.iter().map(|level| level.size).sum()
    }

    /// Simulate consuming `size` units by walking the opposite side in
    /// priority order. Buys walk the asks, sells walk the bids.
    ///
    /// Slippage is signed relative to the mid price and mirrored for sells,
    /// so a positive value always means "worse than mid". Fails with
    /// [`BookError::InsufficientLiquidity`] when total depth cannot cover
    /// `size`; a partial average is never reported silently.
    pub fn market_impact(&self, size: Decimal, side: Side) -> Result<ImpactReport, BookError> {
        let levels = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };

        let available = Self::side_depth(levels);
        if available < size || size <= Decimal::ZERO {
            return Err(BookError::InsufficientLiquidity {
                requested: size,
                available,
            });
        }

        let mut remaining = size;
        let mut total_cost = Decimal::ZERO;
        let mut levels_consumed = 0;
        for level in levels {
            if remaining.is_zero() {
                break;
            }
            let fill = remaining.min(level.size);
            total_cost += fill * level.price;
            remaining -= fill;
            levels_consumed += 1;
        }

        let average_price = total_cost / size;
        let slippage_percent = self.mid_price().and_then(|mid| {
            if mid.is_zero() {
                return None;
            }
            let raw = (average_price - mid) / mid * Decimal::ONE_HUNDRED;
            Some(match side {
                Side::Buy => raw,
                Side::Sell => -raw,
            })
        });

        Ok(ImpactReport {
            average_price,
            total_cost,
            slippage_percent,
            levels_consumed,
        })
    }
}

/// Books for every fetched outcome of one market, plus the outcomes that
/// could not be fetched. Partial failure is reported, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrderBooks {
    pub market_id: String,
    pub question: Option<String>,
    pub books: BTreeMap<String, OrderBook>,
    pub failed_outcomes: Vec<String>,
    pub fetched_at: UtcDateTime,
}

impl MarketOrderBooks {
    pub fn outcome_book(&self, outcome: &str) -> Option<&OrderBook> {
        self.books.get(outcome)
    }

    pub fn spreads(&self) -> BTreeMap<&str, Option<Decimal>> {
        self.books
            .iter()
            .map(|(outcome, book)| (outcome.as_str(), book.spread()))
            .collect()
    }

    pub fn mid_prices(&self) -> BTreeMap<&str, Option<Decimal>> {
        self.books
            .iter()
            .map(|(outcome, book)| (outcome.as_str(), book.mid_price()))
            .collect()
    }

    pub fn best_prices(&self) -> BTreeMap<&str, (Option<Decimal>, Option<Decimal>)> {
        self.books
            .iter()
            .map(|(outcome, book)| {
                (
                    outcome.as_str(),
                    (
                        book.best_bid().map(|level| level.price),
                        book.best_ask().map(|level| level.price),
                    ),
                )
            })
            .collect()
    }
}
