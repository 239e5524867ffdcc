//! Behavior-driven tests for the analytics surface
//!
//! These tests verify HOW order-book impact, history merging, range
//! clipping, and summary statistics behave on realistic market data.

use std::collections::BTreeMap;

use polyscope_core::merge::{merge_histories, MergeStrategy, MergedRows, Row};
use polyscope_core::orderbook::{BookError, OrderBook, OrderLevel, Side};
use polyscope_core::timerange::TimeRange;
use polyscope_core::{
    summary_stats, Interval, Market, PriceHistory, PricePoint, UtcDateTime,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn level(price: Decimal, size: Decimal) -> OrderLevel {
    OrderLevel::new(price, size).expect("valid level")
}

fn ts(unix: i64) -> UtcDateTime {
    UtcDateTime::from_unix_timestamp(unix).expect("valid timestamp")
}

fn book(bids: Vec<OrderLevel>, asks: Vec<OrderLevel>) -> OrderBook {
    OrderBook::new("0xc1", "11", "Yes", bids, asks, ts(1_000)).expect("uncrossed book")
}

fn history(outcome: &str, points: &[(i64, Decimal)]) -> PriceHistory {
    PriceHistory::from_points(
        "0xc1",
        "11",
        outcome,
        Interval::OneDay,
        points
            .iter()
            .map(|(unix, price)| PricePoint::new(ts(*unix), *price).expect("valid point"))
            .collect(),
    )
}

// =============================================================================
// Order Books: Market Impact
// =============================================================================

#[test]
fn when_a_buy_walks_the_asks_the_average_price_reflects_each_level() {
    // Given: 100 shares at 0.50 and 200 more at 0.55
    let book = book(
        vec![level(dec!(0.48), dec!(500))],
        vec![level(dec!(0.50), dec!(100)), level(dec!(0.55), dec!(200))],
    );

    // When: a 150-share buy walks the book
    let report = book
        .market_impact(dec!(150), Side::Buy)
        .expect("enough depth");

    // Then: 100 fill at 0.50 and 50 at 0.55
    assert_eq!(report.total_cost, dec!(77.50));
    assert_eq!(report.average_price.round_dp(5), dec!(0.51667));
    assert_eq!(report.levels_consumed, 2);
}

#[test]
fn when_the_order_exceeds_the_book_no_partial_answer_is_invented() {
    let book = book(
        vec![level(dec!(0.48), dec!(500))],
        vec![level(dec!(0.50), dec!(100)), level(dec!(0.55), dec!(200))],
    );

    let err = book
        .market_impact(dec!(1000), Side::Buy)
        .expect_err("book is too thin");

    assert_eq!(
        err,
        BookError::InsufficientLiquidity {
            requested: dec!(1000),
            available: dec!(300),
        }
    );
}

#[test]
fn when_a_sell_walks_the_bids_worse_than_mid_is_still_positive_slippage() {
    // Given: mid is 0.50; selling walks down the bids
    let book = book(
        vec![level(dec!(0.48), dec!(100)), level(dec!(0.40), dec!(200))],
        vec![level(dec!(0.52), dec!(100))],
    );

    // When: a 200-share sell executes below mid
    let report = book
        .market_impact(dec!(200), Side::Sell)
        .expect("enough depth");

    // Then: slippage is positive, the sign mirrors the buy convention
    let slippage = report.slippage_percent.expect("mid exists");
    assert!(slippage > Decimal::ZERO, "slippage: {slippage}");
    assert!(report.average_price < dec!(0.50));
}

#[test]
fn when_quotes_cross_the_book_is_rejected_at_construction() {
    let err = OrderBook::new(
        "0xc1",
        "11",
        "Yes",
        vec![level(dec!(0.55), dec!(10))],
        vec![level(dec!(0.54), dec!(10))],
        ts(1_000),
    )
    .expect_err("crossed quotes");

    assert_eq!(
        err,
        BookError::Crossed {
            best_bid: dec!(0.55),
            best_ask: dec!(0.54),
        }
    );
}

// =============================================================================
// History Merge: One Timestamp Axis
// =============================================================================

#[test]
fn when_outcomes_observe_at_different_times_gaps_forward_fill() {
    // Given: interleaved observations for two outcomes
    let mut histories = BTreeMap::new();
    histories.insert(
        String::from("Yes"),
        history("Yes", &[(1, dec!(0.2)), (3, dec!(0.3)), (5, dec!(0.4))]),
    );
    histories.insert(
        String::from("No"),
        history("No", &[(2, dec!(0.6)), (4, dec!(0.7))]),
    );

    // When: the table is merged
    let table = merge_histories(&histories);

    // Then: rows cover the timestamp union; cells before an outcome's
    // first observation stay absent rather than zero
    assert_eq!(table.columns, vec!["No", "Yes"]);
    assert_eq!(table.rows.len(), 5);
    assert_eq!(table.rows[0].values, vec![None, Some(dec!(0.2))]);
    assert_eq!(table.rows[1].values, vec![Some(dec!(0.6)), Some(dec!(0.2))]);
    assert_eq!(table.rows[4].values, vec![Some(dec!(0.7)), Some(dec!(0.4))]);
}

#[test]
fn when_streamed_and_materialized_merges_run_their_rows_are_identical() {
    // Given: a wide fixture with ragged, partially overlapping series
    let mut histories = BTreeMap::new();
    for series in 0..15 {
        let points: Vec<(i64, Decimal)> = (0..40)
            .map(|step| {
                let unix = (step * (series + 2)) as i64;
                let price = Decimal::new(100 + ((series * 7 + step * 13) % 800) as i64, 3);
                (unix, price)
            })
            .collect();
        histories.insert(format!("outcome-{series:02}"), history("x", &points));
    }

    // When: both strategies run
    let materialized = merge_histories(&histories).rows;
    let streamed: Vec<Row> = MergedRows::new(&histories).collect();

    // Then: row-for-row equality, and auto picks streaming at this width
    assert_eq!(materialized, streamed);
    assert_eq!(
        MergeStrategy::Auto.resolve(histories.len(), 10),
        MergeStrategy::Streaming
    );
}

// =============================================================================
// Time Ranges: Market Lifetime Clipping
// =============================================================================

#[test]
fn when_the_request_predates_the_market_the_range_is_clipped_and_flagged() {
    // Given: a market created a week ago and a 30-day request
    let created = ts(1_700_000_000);
    let market = Market {
        slug: String::from("new-market"),
        start_date: Some(created),
        ..Market::default()
    };
    let range = TimeRange::new(ts(1_698_000_000), ts(1_700_600_000)).expect("valid range");

    // When: the range is clipped to the market lifetime
    let clipped = range.clip_to_market(&market);

    // Then: the start moved up to creation and the adjustment is visible
    assert!(clipped.adjusted);
    assert_eq!(clipped.range.start, created);
    assert_eq!(clipped.range.end, ts(1_700_600_000));
}

#[test]
fn when_the_request_fits_the_lifetime_nothing_is_touched() {
    let market = Market {
        slug: String::from("old-market"),
        start_date: Some(ts(100)),
        ..Market::default()
    };
    let range = TimeRange::new(ts(500), ts(900)).expect("valid range");

    let clipped = range.clip_to_market(&market);

    assert!(!clipped.adjusted);
    assert_eq!(clipped.range.start, ts(500));
}

// =============================================================================
// Histories: Ordering and Statistics
// =============================================================================

#[test]
fn when_points_arrive_shuffled_the_series_comes_out_ordered_and_deduped() {
    let series = history(
        "Yes",
        &[(300, dec!(0.5)), (100, dec!(0.2)), (300, dec!(0.55)), (200, dec!(0.4))],
    );

    let stamps: Vec<i64> = series
        .points()
        .iter()
        .map(|point| point.timestamp.unix_timestamp())
        .collect();
    assert_eq!(stamps, vec![100, 200, 300]);
    // The later write for a duplicated timestamp wins.
    assert_eq!(series.latest_price(), Some(dec!(0.55)));
}

#[test]
fn when_statistics_summarize_a_series_the_change_is_end_to_end() {
    let series = history("Yes", &[(1, dec!(0.25)), (2, dec!(0.45)), (3, dec!(0.75))]);

    let stats = summary_stats(&series).expect("non-empty series");

    assert_eq!(stats.count, 3);
    assert_eq!(stats.oldest, dec!(0.25));
    assert_eq!(stats.latest, dec!(0.75));
    assert_eq!(stats.change, Some(dec!(0.5)));
    assert_eq!(stats.change_percent, Some(dec!(200.0000)));
    assert_eq!(stats.median, dec!(0.45));
}
