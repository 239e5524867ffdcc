//! Client for the trading-data source (order books, prices, history).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::{query_string, SourceError};
use crate::http_client::{HttpAuth, HttpRequest};
use crate::orderbook::{OrderBook, OrderLevel};
use crate::transport::Transport;
use crate::{Interval, Market, PriceHistory, PricePoint, UtcDateTime};

/// Cursor value marking the final page of a market listing.
const TERMINAL_CURSOR: &str = "LTE=";

/// One page of the paginated market listing.
#[derive(Debug, Clone)]
pub struct MarketsPage {
    pub markets: Vec<Market>,
    pub next_cursor: Option<String>,
}

impl MarketsPage {
    pub fn is_last(&self) -> bool {
        match self.next_cursor.as_deref() {
            None | Some("") | Some(TERMINAL_CURSOR) => true,
            Some(_) => false,
        }
    }
}

/// Parameters for a price-history fetch.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
    /// Resolution in minutes; provider-side downsampling.
    pub fidelity: Option<u32>,
}

#[derive(Clone)]
pub struct ClobClient {
    transport: Transport,
    base_url: String,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl ClobClient {
    pub fn new(transport: Transport, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            auth: HttpAuth::None,
            timeout_ms: HttpRequest::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth = HttpAuth::BearerToken(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn request(&self, path_and_query: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path_and_query}", self.base_url))
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    /// One page of the market listing.
    pub async fn markets_page(&self, cursor: Option<&str>) -> Result<MarketsPage, SourceError> {
        let query = match cursor {
            Some(cursor) => query_string(&[("next_cursor", cursor.to_owned())]),
            None => String::new(),
        };
        let page: MarketsPageWire = self
            .transport
            .execute_json(self.request(&format!("/markets{query}")))
            .await?;

        Ok(MarketsPage {
            markets: page.data.into_iter().map(ClobMarketWire::into_market).collect(),
            next_cursor: page.next_cursor,
        })
    }

    /// Paged scan of the full listing for an exact slug match.
    pub async fn find_market_by_slug(&self, slug: &str) -> Result<Option<Market>, SourceError> {
        let mut cursor: Option<String> = None;
        loop {
            let page = self.markets_page(cursor.as_deref()).await?;
            if let Some(market) = page.markets.iter().find(|market| market.slug == slug) {
                return Ok(Some(market.clone()));
            }
            if page.is_last() || page.next_cursor == cursor {
                return Ok(None);
            }
            cursor = page.next_cursor;
        }
    }

    /// Keyword scan over question and slug, stopping at `limit` matches.
    pub async fn search_markets(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Market>, SourceError> {
        let needle = keyword.to_lowercase();
        let mut matches = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.markets_page(cursor.as_deref()).await?;
            for market in &page.markets {
                let question = market.question.as_deref().unwrap_or("").to_lowercase();
                if question.contains(&needle) || market.slug.to_lowercase().contains(&needle) {
                    matches.push(market.clone());
                    if matches.len() >= limit {
                        return Ok(matches);
                    }
                }
            }
            if page.is_last() || page.next_cursor == cursor {
                return Ok(matches);
            }
            cursor = page.next_cursor;
        }
    }

    /// Price history for one token. The outcome label is unknown at this
    /// layer and left empty for the caller to fill.
    pub async fn price_history(
        &self,
        token_id: &str,
        interval: Interval,
        query: &HistoryQuery,
    ) -> Result<PriceHistory, SourceError> {
        let mut pairs = vec![
            ("market", token_id.to_owned()),
            ("interval", interval.as_str().to_owned()),
        ];
        if let Some(start_ts) = query.start_ts {
            pairs.push(("startTs", start_ts.to_string()));
        }
        if let Some(end_ts) = query.end_ts {
            pairs.push(("endTs", end_ts.to_string()));
        }
        if let Some(fidelity) = query.fidelity {
            pairs.push(("fidelity", fidelity.to_string()));
        }

        let wire: HistoryWire = self
            .transport
            .execute_json(self.request(&format!("/prices-history{}", query_string(&pairs))))
            .await?;

        let mut points = Vec::with_capacity(wire.history.len());
        for point in wire.history {
            let timestamp = UtcDateTime::from_unix_timestamp(point.t)
                .map_err(|err| SourceError::integrity(err.to_string()))?;
            let point = PricePoint::new(timestamp, point.p)
                .map_err(|err| SourceError::integrity(err.to_string()))?;
            points.push(point);
        }
        debug!(token_id, count = points.len(), "fetched price history");

        Ok(PriceHistory::from_points(
            token_id, token_id, "", interval, points,
        ))
    }

    /// Order book snapshot for one token.
    pub async fn order_book(&self, token_id: &str) -> Result<OrderBook, SourceError> {
        let query = query_string(&[("token_id", token_id.to_owned())]);
        let wire: BookWire = self
            .transport
            .execute_json(self.request(&format!("/book{query}")))
            .await?;
        wire.into_book(token_id)
    }

    /// Batch order books, keyed by token id. Malformed entries are logged
    /// and dropped; callers detect the gap by the missing key.
    pub async fn order_books(
        &self,
        token_ids: &[&str],
    ) -> Result<BTreeMap<String, OrderBook>, SourceError> {
        let pairs: Vec<(&str, String)> = token_ids
            .iter()
            .map(|token_id| ("token_id", (*token_id).to_owned()))
            .collect();
        let wires: Vec<BookWire> = self
            .transport
            .execute_json(self.request(&format!("/books{}", query_string(&pairs))))
            .await?;

        let mut books = BTreeMap::new();
        for wire in wires {
            let token_id = match wire.token_id.clone() {
                Some(token_id) if !token_id.is_empty() => token_id,
                _ => {
                    warn!("order book entry without token_id, skipping");
                    continue;
                }
            };
            match wire.into_book(&token_id) {
                Ok(book) => {
                    books.insert(token_id, book);
                }
                Err(err) => warn!(token_id, %err, "dropping malformed order book"),
            }
        }
        Ok(books)
    }

    /// Midpoint price for one token.
    pub async fn midpoint(&self, token_id: &str) -> Result<Decimal, SourceError> {
        let query = query_string(&[("token_id", token_id.to_owned())]);
        let wire: MidpointWire = self
            .transport
            .execute_json(self.request(&format!("/midpoint{query}")))
            .await?;
        Ok(wire.mid)
    }

    /// Quoted spread for one token.
    pub async fn spread(&self, token_id: &str) -> Result<Decimal, SourceError> {
        let query = query_string(&[("token_id", token_id.to_owned())]);
        let wire: SpreadWire = self
            .transport
            .execute_json(self.request(&format!("/spread{query}")))
            .await?;
        Ok(wire.spread)
    }
}

#[derive(Debug, Deserialize)]
struct MarketsPageWire {
    #[serde(default)]
    data: Vec<ClobMarketWire>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenWire {
    #[serde(default)]
    token_id: String,
    #[serde(default)]
    outcome: String,
}

#[derive(Debug, Deserialize)]
struct ClobMarketWire {
    #[serde(default)]
    market_slug: String,
    #[serde(default)]
    condition_id: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    tokens: Vec<TokenWire>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    closed: Option<bool>,
    #[serde(default)]
    archived: Option<bool>,
    #[serde(default)]
    end_date_iso: Option<String>,
    #[serde(default)]
    neg_risk: bool,
    #[serde(default)]
    neg_risk_market_id: Option<String>,
    #[serde(default)]
    group_item_title: Option<String>,
}

impl ClobMarketWire {
    fn into_market(self) -> Market {
        let mut outcomes = Vec::new();
        let mut token_ids = Vec::new();
        for token in self.tokens {
            // Placeholder tokens arrive with empty ids in neg-risk groups.
            if !token.token_id.is_empty() && !token.outcome.is_empty() {
                token_ids.push(token.token_id);
                outcomes.push(token.outcome);
            }
        }

        Market {
            slug: self.market_slug,
            condition_id: self.condition_id.filter(|id| !id.is_empty()),
            question: self.question.filter(|q| !q.is_empty()),
            outcomes,
            token_ids,
            active: self.active,
            closed: self.closed,
            archived: self.archived,
            volume: None,
            liquidity: None,
            start_date: None,
            end_date: self
                .end_date_iso
                .and_then(|raw| UtcDateTime::parse(&raw).ok()),
            neg_risk: self.neg_risk,
            neg_risk_market_id: self.neg_risk_market_id.filter(|id| !id.is_empty()),
            group_item_title: self.group_item_title.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LevelWire {
    price: Decimal,
    size: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    token_id: Option<String>,
    #[serde(default)]
    bids: Vec<LevelWire>,
    #[serde(default)]
    asks: Vec<LevelWire>,
}

impl BookWire {
    fn into_book(self, token_id: &str) -> Result<OrderBook, SourceError> {
        let convert = |levels: Vec<LevelWire>| -> Result<Vec<OrderLevel>, SourceError> {
            levels
                .into_iter()
                .map(|level| {
                    OrderLevel::new(level.price, level.size)
                        .map_err(|err| SourceError::integrity(err.to_string()))
                })
                .collect()
        };

        OrderBook::new(
            self.market.unwrap_or_default(),
            token_id,
            "",
            convert(self.bids)?,
            convert(self.asks)?,
            UtcDateTime::now(),
        )
        .map_err(|err| SourceError::integrity(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryPointWire {
    t: i64,
    p: Decimal,
}

#[derive(Debug, Deserialize)]
struct HistoryWire {
    #[serde(default)]
    history: Vec<HistoryPointWire>,
}

#[derive(Debug, Deserialize)]
struct MidpointWire {
    mid: Decimal,
}

#[derive(Debug, Deserialize)]
struct SpreadWire {
    spread: Decimal,
}
