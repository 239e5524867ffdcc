//! Alignment of per-outcome price histories on a shared timestamp axis.
//!
//! Two interchangeable strategies share one contract: rows ascending in
//! time over the union of all observed timestamps, each outcome
//! forward-filled from its last observation. Left of an outcome's first
//! observation the cell is absent, never zero-filled. Both strategies
//! produce identical rows; streaming only trades memory for latency.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{PriceHistory, UtcDateTime};

/// One aligned output row. `values` line up with the column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub timestamp: UtcDateTime,
    pub values: Vec<Option<Decimal>>,
}

/// Which merge implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Pick based on series count and the configured threshold.
    #[default]
    Auto,
    Materialized,
    Streaming,
}

impl MergeStrategy {
    /// Resolve `Auto` against the series count. Streaming kicks in above
    /// the threshold.
    pub fn resolve(self, series_count: usize, streaming_threshold: usize) -> MergeStrategy {
        match self {
            Self::Auto if series_count > streaming_threshold => Self::Streaming,
            Self::Auto => Self::Materialized,
            other => other,
        }
    }
}

/// Fully materialized merge result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Materialized merge: builds the full timestamp union in memory.
pub fn merge_histories(histories: &BTreeMap<String, PriceHistory>) -> MergedTable {
    let columns: Vec<String> = histories.keys().cloned().collect();
    let rows = MergedRows::new(histories).collect();
    MergedTable { columns, rows }
}

/// Merge output in whichever representation the resolved strategy chose.
pub enum Merge<'a> {
    Materialized(MergedTable),
    Streaming {
        columns: Vec<String>,
        rows: MergedRows<'a>,
    },
}

impl Merge<'_> {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming { .. })
    }

    /// Materialize regardless of variant. Collects the streaming rows.
    pub fn into_table(self) -> MergedTable {
        match self {
            Self::Materialized(table) => table,
            Self::Streaming { columns, rows } => MergedTable {
                columns,
                rows: rows.collect(),
            },
        }
    }
}

/// Merge after resolving the strategy against the series count. `Auto`
/// switches to streaming when the count exceeds the threshold.
pub fn merge_with_strategy(
    histories: &BTreeMap<String, PriceHistory>,
    strategy: MergeStrategy,
    streaming_threshold: usize,
) -> Merge<'_> {
    match strategy.resolve(histories.len(), streaming_threshold) {
        MergeStrategy::Streaming => Merge::Streaming {
            columns: MergedRows::columns(histories),
            rows: MergedRows::new(histories),
        },
        _ => Merge::Materialized(merge_histories(histories)),
    }
}

struct SeriesCursor<'a> {
    points: &'a [crate::PricePoint],
    next: usize,
    current: Option<Decimal>,
}

/// Streaming merge: yields the same rows as [`merge_histories`] while
/// holding only one cursor and one current value per outcome.
///
/// The iterator is finite and restartable; build a fresh one to replay.
pub struct MergedRows<'a> {
    series: Vec<SeriesCursor<'a>>,
}

impl<'a> MergedRows<'a> {
    pub fn new(histories: &'a BTreeMap<String, PriceHistory>) -> Self {
        Self {
            series: histories
                .values()
                .map(|history| SeriesCursor {
                    points: history.points(),
                    next: 0,
                    current: None,
                })
                .collect(),
        }
    }

    pub fn columns(histories: &BTreeMap<String, PriceHistory>) -> Vec<String> {
        histories.keys().cloned().collect()
    }
}

impl Iterator for MergedRows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        // Next row timestamp: earliest unconsumed observation across series.
        let timestamp = self
            .series
            .iter()
            .filter_map(|series| series.points.get(series.next))
            .map(|point| point.timestamp)
            .min()?;

        let values = self
            .series
            .iter_mut()
            .map(|series| {
                if let Some(point) = series.points.get(series.next) {
                    if point.timestamp == timestamp {
                        series.current = Some(point.price);
                        series.next += 1;
                    }
                }
                series.current
            })
            .collect();

        Some(Row { timestamp, values })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{Interval, PricePoint};

    fn history(points: &[(i64, Decimal)]) -> PriceHistory {
        PriceHistory::from_points(
            "m",
            "t",
            "",
            Interval::OneDay,
            points
                .iter()
                .map(|(ts, price)| {
                    PricePoint::new(
                        UtcDateTime::from_unix_timestamp(*ts).expect("valid ts"),
                        *price,
                    )
                    .expect("valid point")
                })
                .collect(),
        )
    }

    fn two_outcome_fixture() -> BTreeMap<String, PriceHistory> {
        let mut map = BTreeMap::new();
        map.insert(
            String::from("A"),
            history(&[(1, dec!(0.2)), (3, dec!(0.3)), (5, dec!(0.4))]),
        );
        map.insert(String::from("B"), history(&[(2, dec!(0.6)), (4, dec!(0.7))]));
        map
    }

    #[test]
    fn forward_fills_gaps_and_leaves_leading_cells_absent() {
        let table = merge_histories(&two_outcome_fixture());

        assert_eq!(table.columns, vec!["A", "B"]);
        let rows: Vec<(i64, Vec<Option<Decimal>>)> = table
            .rows
            .iter()
            .map(|row| (row.timestamp.unix_timestamp(), row.values.clone()))
            .collect();

        assert_eq!(
            rows,
            vec![
                (1, vec![Some(dec!(0.2)), None]),
                (2, vec![Some(dec!(0.2)), Some(dec!(0.6))]),
                (3, vec![Some(dec!(0.3)), Some(dec!(0.6))]),
                (4, vec![Some(dec!(0.3)), Some(dec!(0.7))]),
                (5, vec![Some(dec!(0.4)), Some(dec!(0.7))]),
            ]
        );
    }

    #[test]
    fn streaming_rows_match_materialized_rows_exactly() {
        let histories = two_outcome_fixture();
        let materialized = merge_histories(&histories).rows;
        let streamed: Vec<Row> = MergedRows::new(&histories).collect();
        assert_eq!(materialized, streamed);
    }

    #[test]
    fn shared_timestamps_collapse_into_one_row() {
        let mut map = BTreeMap::new();
        map.insert(String::from("A"), history(&[(1, dec!(0.2)), (2, dec!(0.3))]));
        map.insert(String::from("B"), history(&[(1, dec!(0.8)), (2, dec!(0.7))]));

        let table = merge_histories(&map);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values, vec![Some(dec!(0.2)), Some(dec!(0.8))]);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        let table = merge_histories(&BTreeMap::new());
        assert!(table.rows.is_empty());
        assert!(table.columns.is_empty());
    }

    #[test]
    fn auto_merge_streams_above_the_threshold() {
        let histories = two_outcome_fixture();

        let merged = merge_with_strategy(&histories, MergeStrategy::Auto, 1);
        assert!(merged.is_streaming());
        // Either representation carries the same table.
        assert_eq!(merged.into_table(), merge_histories(&histories));
    }

    #[test]
    fn auto_merge_materializes_at_or_below_the_threshold() {
        let histories = two_outcome_fixture();

        let merged = merge_with_strategy(&histories, MergeStrategy::Auto, 2);
        assert!(!merged.is_streaming());
    }

    #[test]
    fn strategy_resolution_honors_threshold() {
        assert_eq!(
            MergeStrategy::Auto.resolve(3, 10),
            MergeStrategy::Materialized
        );
        assert_eq!(MergeStrategy::Auto.resolve(11, 10), MergeStrategy::Streaming);
        assert_eq!(
            MergeStrategy::Streaming.resolve(1, 10),
            MergeStrategy::Streaming
        );
    }
}
