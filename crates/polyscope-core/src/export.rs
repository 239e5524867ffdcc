//! Row-oriented export surface and derived statistics.
//!
//! Writers (CSV, spreadsheets) live outside this crate; they consume the
//! aligned rows from [`crate::merge`], the flat metadata maps, and the
//! summary statistics produced here.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;

use crate::{Event, Market, PriceHistory, PRICE_PRECISION};

/// Export column name for one outcome of a market: prefix + lowercased
/// outcome label.
pub fn column_name(market: &Market, outcome: &str) -> String {
    format!("{}_{}", market.column_prefix(), outcome.to_lowercase())
}

/// Column names for all outcomes of a market, in outcome order.
pub fn column_names(market: &Market) -> Vec<String> {
    market
        .outcomes
        .iter()
        .map(|outcome| column_name(market, outcome))
        .collect()
}

/// Flat key-value metadata block written ahead of a market's rows.
pub fn market_metadata(market: &Market) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    meta.insert(String::from("slug"), market.slug.clone());
    if let Some(condition_id) = &market.condition_id {
        meta.insert(String::from("condition_id"), condition_id.clone());
    }
    if let Some(question) = &market.question {
        meta.insert(String::from("question"), question.clone());
    }
    meta.insert(String::from("outcomes"), market.outcomes.join(", "));
    if let Some(active) = market.active {
        meta.insert(String::from("active"), active.to_string());
    }
    if let Some(volume) = market.volume {
        meta.insert(String::from("volume"), volume.to_string());
    }
    if let Some(liquidity) = market.liquidity {
        meta.insert(String::from("liquidity"), liquidity.to_string());
    }
    if let Some(end_date) = market.end_date {
        meta.insert(String::from("end_date"), end_date.to_string());
    }
    meta
}

/// Flat key-value metadata block for an event export.
pub fn event_metadata(event: &Event) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    meta.insert(String::from("id"), event.id.clone());
    meta.insert(String::from("slug"), event.slug.clone());
    if let Some(title) = &event.title {
        meta.insert(String::from("title"), title.clone());
    }
    meta.insert(String::from("markets"), event.markets.len().to_string());
    if let Some(volume) = event.volume {
        meta.insert(String::from("volume"), volume.to_string());
    }
    meta.insert(String::from("neg_risk"), event.neg_risk.to_string());
    meta
}

/// Derived statistics over one outcome's price series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: Decimal,
    pub std_dev: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub median: Decimal,
    pub latest: Decimal,
    pub oldest: Decimal,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
}

/// Summary statistics for a history; `None` when the series is empty.
///
/// Standard deviation is the sample deviation (n-1 denominator), matching
/// common spreadsheet output.
pub fn summary_stats(history: &PriceHistory) -> Option<SummaryStats> {
    let prices: Vec<Decimal> = history.points().iter().map(|point| point.price).collect();
    let count = prices.len();
    if count == 0 {
        return None;
    }

    let n = Decimal::from(count);
    let sum: Decimal = prices.iter().copied().sum();
    let mean = sum / n;

    let std_dev = if count > 1 {
        let variance = prices
            .iter()
            .map(|price| (*price - mean) * (*price - mean))
            .sum::<Decimal>()
            / Decimal::from(count - 1);
        variance.sqrt().unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let mut sorted = prices.clone();
    sorted.sort();
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / Decimal::TWO
    };

    let min = *sorted.first()?;
    let max = *sorted.last()?;

    Some(SummaryStats {
        count,
        mean: mean.round_dp(PRICE_PRECISION),
        std_dev: std_dev.round_dp(PRICE_PRECISION),
        min,
        max,
        median,
        latest: *prices.last()?,
        oldest: *prices.first()?,
        change: history.price_change(),
        change_percent: history.price_change_percent(),
    })
}
