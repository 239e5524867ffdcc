//! Unified entry point deciding which source(s) answer each operation.
//!
//! The routing policy is a declarative table (operation to ordered source
//! list) rather than nested conditionals, so it can be unit-tested away
//! from any network code. All clients share one [`Transport`], so the
//! request budget is global across sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::cache::{CacheMode, MarketCache};
use crate::clients::{
    ActivityQuery, ActivityRecord, ClobClient, DataClient, GammaClient, Holder, HoldingsPoint,
    HistoryQuery, Position, PositionQuery, SourceError, SourceErrorKind, TradeRecord,
};
use crate::config::Config;
use crate::http_client::HttpClient;
use crate::merge::{merge_with_strategy, Merge, MergeStrategy};
use crate::orderbook::MarketOrderBooks;
use crate::rate_limit::RateBudget;
use crate::retry::{Backoff, RetryConfig};
use crate::timerange::TimeRange;
use crate::transport::Transport;
use crate::{Event, Interval, Market, PriceHistory, UtcDateTime};

/// Operations the router can plan for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetMarket,
    SearchMarkets,
    PriceHistory,
    OrderBooks,
    MarketPrices,
    GetEvent,
    Portfolio,
}

/// The three upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    TradingData,
    Metadata,
    Portfolio,
}

/// Ordered source list per operation. First entry is consulted first;
/// later entries are fallbacks.
pub const fn source_order(operation: Operation) -> &'static [SourceId] {
    match operation {
        Operation::GetMarket => &[SourceId::TradingData, SourceId::Metadata],
        Operation::SearchMarkets => &[SourceId::Metadata, SourceId::TradingData],
        Operation::PriceHistory | Operation::OrderBooks | Operation::MarketPrices => {
            &[SourceId::TradingData]
        }
        Operation::GetEvent => &[SourceId::Metadata],
        Operation::Portfolio => &[SourceId::Portfolio],
    }
}

/// Per-outcome failure inside an otherwise successful batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeFailure {
    pub outcome: String,
    pub error: SourceError,
}

/// Result of a multi-outcome history fetch. Failed outcomes are omitted
/// from the mapping and reported; they never abort the others.
#[derive(Debug, Clone)]
pub struct HistoryFetch {
    pub histories: BTreeMap<String, PriceHistory>,
    pub failures: Vec<OutcomeFailure>,
    /// True when the requested range was clipped to the market's lifetime.
    pub adjusted: bool,
}

/// Which quote to extract when fetching per-outcome prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSide {
    Bid,
    Ask,
    Mid,
}

/// Unified data access across the three sources.
#[derive(Clone)]
pub struct DataRouter {
    clob: ClobClient,
    gamma: GammaClient,
    data: DataClient,
    cache: MarketCache,
    streaming_threshold: usize,
}

impl DataRouter {
    /// Wire up all clients over one shared transport.
    pub fn new(config: &Config, http: Arc<dyn HttpClient>) -> Self {
        let retry = RetryConfig {
            max_retries: config.max_retries,
            backoff: Backoff::Exponential {
                base: config.retry_base_delay,
                factor: 2.0,
                max: std::time::Duration::from_secs(30),
                jitter: false,
            },
            ..RetryConfig::default()
        };
        let budget = RateBudget::new(config.window, config.requests_per_window);
        let transport = Transport::new(http, budget, retry);

        let timeout_ms = config.timeout.as_millis() as u64;
        let mut clob =
            ClobClient::new(transport.clone(), &config.clob_base_url).with_timeout(timeout_ms);
        if let Some(api_key) = &config.api_key {
            clob = clob.with_api_key(api_key.clone());
        }

        Self {
            clob,
            gamma: GammaClient::new(transport.clone(), &config.gamma_base_url)
                .with_timeout(timeout_ms),
            data: DataClient::new(transport, &config.data_base_url).with_timeout(timeout_ms),
            cache: MarketCache::new(config.cache_ttl),
            streaming_threshold: config.streaming_threshold,
        }
    }

    /// Assemble from already-built clients; used by tests and callers with
    /// custom per-client setups.
    pub fn from_parts(
        clob: ClobClient,
        gamma: GammaClient,
        data: DataClient,
        cache: MarketCache,
    ) -> Self {
        Self {
            clob,
            gamma,
            data,
            cache,
            streaming_threshold: Config::default().streaming_threshold,
        }
    }

    /// Merge per-outcome histories, letting `Auto` consult the configured
    /// streaming threshold.
    pub fn merge_histories<'a>(
        &self,
        histories: &'a BTreeMap<String, PriceHistory>,
        strategy: MergeStrategy,
    ) -> Merge<'a> {
        merge_with_strategy(histories, strategy, self.streaming_threshold)
    }

    /// Resolve a market by slug.
    ///
    /// The trading-data source is consulted first (freshest books and
    /// tokens); the metadata source fills missing fields or serves as the
    /// fallback. When both fail, the metadata failure is surfaced since it
    /// carries the richer diagnostics.
    pub async fn get_market(
        &self,
        slug: &str,
        cache_mode: CacheMode,
    ) -> Result<Market, SourceError> {
        if cache_mode == CacheMode::Use {
            if let Some(market) = self.cache.get(slug).await {
                debug!(slug, "market cache hit");
                return Ok(market);
            }
        }

        let market = self.resolve_market(slug).await?;
        if cache_mode != CacheMode::Bypass {
            self.cache.put(&market).await;
        }
        Ok(market)
    }

    async fn resolve_market(&self, slug: &str) -> Result<Market, SourceError> {
        match self.clob.find_market_by_slug(slug).await {
            Ok(Some(market)) => {
                info!(slug, "market found in trading-data source");
                // Metadata enrichment is best-effort; trading-data fields
                // take precedence in the merge.
                match self.gamma.market_by_slug(slug).await {
                    Ok(Some(metadata)) => Ok(metadata.merged(market)),
                    Ok(None) => Ok(market),
                    Err(err) => {
                        debug!(slug, %err, "metadata enrichment unavailable");
                        Ok(market)
                    }
                }
            }
            Ok(None) => {
                debug!(slug, "not in trading-data listing, trying metadata source");
                match self.gamma.market_by_slug(slug).await? {
                    Some(market) => Ok(market),
                    None => Err(SourceError::not_found(format!("no market '{slug}'"))),
                }
            }
            Err(primary) if triggers_fallback(&primary) => {
                warn!(slug, %primary, "trading-data source failed, trying metadata source");
                match self.gamma.market_by_slug(slug).await {
                    Ok(Some(market)) => Ok(market),
                    Ok(None) => Err(SourceError::not_found(format!("no market '{slug}'"))),
                    // Surface the metadata failure, not the primary one.
                    Err(err) => Err(err),
                }
            }
            Err(primary) => Err(primary),
        }
    }

    /// Keyword search. The metadata source has full-text search; when its
    /// result set falls short of `limit`, the trading-data listing scan
    /// supplements it, merged by identity with trading-data fields winning.
    pub async fn search_markets(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Market>, SourceError> {
        let mut results = match self.gamma.search_markets(keyword, limit).await {
            Ok(markets) => markets,
            Err(err) if triggers_fallback(&err) => {
                warn!(keyword, %err, "metadata search failed, scanning trading-data listing");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        if results.len() >= limit {
            return Ok(results);
        }

        match self.clob.search_markets(keyword, limit).await {
            Ok(supplements) => {
                for supplement in supplements {
                    if let Some(existing) = results
                        .iter_mut()
                        .find(|market| market.identity() == supplement.identity())
                    {
                        // Trading-data fields win in the identity merge.
                        *existing = std::mem::take(existing).merged(supplement);
                    } else if results.len() < limit {
                        results.push(supplement);
                    }
                }
                Ok(results)
            }
            Err(err) if !results.is_empty() => {
                debug!(keyword, %err, "trading-data supplement unavailable");
                Ok(results)
            }
            Err(err) => Err(err),
        }
    }

    /// Event lookup; metadata source only.
    pub async fn get_event(&self, slug: &str) -> Result<Event, SourceError> {
        match self.gamma.event_by_slug(slug).await? {
            Some(event) => Ok(event),
            None => Err(SourceError::not_found(format!("no event '{slug}'"))),
        }
    }

    /// Price history for every outcome of a market.
    ///
    /// Tokens are queried one at a time (the provider has no batched
    /// multi-token history endpoint), each independently budgeted and
    /// retried. A failed outcome is logged as a gap and omitted.
    pub async fn get_price_history(
        &self,
        market: &Market,
        interval: Interval,
        range: Option<TimeRange>,
        fidelity: Option<u32>,
    ) -> HistoryFetch {
        let (query, adjusted) = match range {
            Some(range) => {
                let clipped = range.clip_to_market(market);
                if clipped.adjusted {
                    info!(
                        slug = %market.slug,
                        start = %clipped.range.start,
                        "range clipped to market lifetime"
                    );
                }
                (
                    HistoryQuery {
                        start_ts: Some(clipped.range.start.unix_timestamp()),
                        end_ts: Some(clipped.range.end.unix_timestamp()),
                        fidelity,
                    },
                    clipped.adjusted,
                )
            }
            None => (
                HistoryQuery {
                    fidelity,
                    ..HistoryQuery::default()
                },
                false,
            ),
        };

        let mut histories = BTreeMap::new();
        let mut failures = Vec::new();
        for (outcome, token_id) in market.outcome_tokens() {
            match self.clob.price_history(token_id, interval, &query).await {
                Ok(history) => {
                    let relabeled = PriceHistory::from_points(
                        market.identity(),
                        token_id,
                        outcome,
                        interval,
                        history.points().to_vec(),
                    );
                    histories.insert(outcome.to_owned(), relabeled);
                }
                Err(error) => {
                    warn!(outcome, token_id, %error, "price history gap");
                    failures.push(OutcomeFailure {
                        outcome: outcome.to_owned(),
                        error,
                    });
                }
            }
        }

        HistoryFetch {
            histories,
            failures,
            adjusted,
        }
    }

    /// Order books for every outcome: batched endpoint first, per-outcome
    /// fetches for whatever the batch did not cover.
    pub async fn get_order_books(&self, market: &Market) -> MarketOrderBooks {
        let token_ids: Vec<&str> = market.token_ids.iter().map(String::as_str).collect();
        let mut by_token = match self.clob.order_books(&token_ids).await {
            Ok(books) => books,
            Err(err) => {
                warn!(slug = %market.slug, %err, "batched books failed, fetching per outcome");
                BTreeMap::new()
            }
        };

        let mut books = BTreeMap::new();
        let mut failed_outcomes = Vec::new();
        for (outcome, token_id) in market.outcome_tokens() {
            let fetched = match by_token.remove(token_id) {
                Some(book) => Ok(book),
                None => self.clob.order_book(token_id).await,
            };
            match fetched {
                Ok(mut book) => {
                    book.outcome = outcome.to_owned();
                    book.market_id = market.identity().to_owned();
                    books.insert(outcome.to_owned(), book);
                }
                Err(err) => {
                    warn!(outcome, token_id, %err, "order book gap");
                    failed_outcomes.push(outcome.to_owned());
                }
            }
        }

        MarketOrderBooks {
            market_id: market.identity().to_owned(),
            question: market.question.clone(),
            books,
            failed_outcomes,
            fetched_at: UtcDateTime::now(),
        }
    }

    /// Current per-outcome prices. Midpoints come from the quote endpoint
    /// with an order-book fallback; bid/ask always read the book.
    pub async fn get_market_prices(
        &self,
        market: &Market,
        side: PriceSide,
    ) -> (BTreeMap<String, Decimal>, Vec<OutcomeFailure>) {
        let mut prices = BTreeMap::new();
        let mut failures = Vec::new();

        for (outcome, token_id) in market.outcome_tokens() {
            if side == PriceSide::Mid {
                match self.clob.midpoint(token_id).await {
                    Ok(mid) => {
                        prices.insert(outcome.to_owned(), mid);
                        continue;
                    }
                    Err(err) => {
                        debug!(outcome, %err, "midpoint unavailable, reading the book")
                    }
                }
            }

            match self.clob.order_book(token_id).await {
                Ok(book) => {
                    let price = match side {
                        PriceSide::Bid => book.best_bid().map(|level| level.price),
                        PriceSide::Ask => book.best_ask().map(|level| level.price),
                        PriceSide::Mid => book.mid_price(),
                    };
                    match price {
                        Some(price) => {
                            prices.insert(outcome.to_owned(), price);
                        }
                        None => failures.push(OutcomeFailure {
                            outcome: outcome.to_owned(),
                            error: SourceError::not_found("book side is empty"),
                        }),
                    }
                }
                Err(error) => {
                    warn!(outcome, token_id, %error, "price gap");
                    failures.push(OutcomeFailure {
                        outcome: outcome.to_owned(),
                        error,
                    });
                }
            }
        }

        (prices, failures)
    }

    // Portfolio operations route exclusively to the portfolio source; no
    // fallback exists, so failures are terminal for the call.

    pub async fn get_positions(&self, query: &PositionQuery) -> Result<Vec<Position>, SourceError> {
        self.data.positions(query).await
    }

    pub async fn get_activity(
        &self,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityRecord>, SourceError> {
        self.data.activity(query).await
    }

    pub async fn get_holders(
        &self,
        condition_id: &str,
        outcome: Option<&str>,
        min_size: Decimal,
        limit: u32,
    ) -> Result<Vec<Holder>, SourceError> {
        self.data.holders(condition_id, outcome, min_size, limit).await
    }

    pub async fn get_trades(
        &self,
        address: &str,
        market: Option<&str>,
        range: Option<TimeRange>,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, SourceError> {
        let (start_ts, end_ts) = match range {
            Some(range) => (
                Some(range.start.unix_timestamp()),
                Some(range.end.unix_timestamp()),
            ),
            None => (None, None),
        };
        self.data
            .trades(address, market, start_ts, end_ts, limit)
            .await
    }

    pub async fn get_holdings_value(
        &self,
        address: &str,
        interval: Interval,
    ) -> Result<Vec<HoldingsPoint>, SourceError> {
        self.data.holdings_value(address, interval.as_str()).await
    }

    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }
}

/// True when an error should trigger consultation of the next source in
/// the plan rather than aborting the operation.
pub fn triggers_fallback(error: &SourceError) -> bool {
    matches!(
        error.kind(),
        SourceErrorKind::NotFound | SourceErrorKind::Unavailable | SourceErrorKind::RateLimited
    )
}
