//! Client for the metadata source (markets and events by slug).
//!
//! This source encodes `outcomes` and `clobTokenIds` as JSON arrays inside
//! JSON strings; decoding happens here so nothing downstream sees it.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::clients::{query_string, SourceError};
use crate::http_client::HttpRequest;
use crate::transport::Transport;
use crate::{Event, Market, UtcDateTime};

/// Filters for market/event listings.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: u32,
    pub active: Option<bool>,
    pub closed: Option<bool>,
    pub order: String,
    pub ascending: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            active: None,
            closed: None,
            order: String::from("volume"),
            ascending: false,
        }
    }
}

impl ListQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("order", self.order.clone()),
            ("ascending", self.ascending.to_string()),
        ];
        if let Some(active) = self.active {
            pairs.push(("active", active.to_string()));
        }
        if let Some(closed) = self.closed {
            pairs.push(("closed", closed.to_string()));
        }
        pairs
    }
}

#[derive(Clone)]
pub struct GammaClient {
    transport: Transport,
    base_url: String,
    timeout_ms: u64,
}

impl GammaClient {
    pub fn new(transport: Transport, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            timeout_ms: HttpRequest::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn request(&self, path_and_query: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path_and_query}", self.base_url))
            .with_timeout_ms(self.timeout_ms)
    }

    /// Direct slug query. The source answers with a (possibly empty) list.
    pub async fn market_by_slug(&self, slug: &str) -> Result<Option<Market>, SourceError> {
        let query = query_string(&[("slug", slug.to_owned())]);
        let wires: Vec<GammaMarketWire> = self
            .transport
            .execute_json(self.request(&format!("/markets{query}")))
            .await?;
        Ok(wires.into_iter().next().map(GammaMarketWire::into_market))
    }

    pub async fn markets(&self, query: &ListQuery) -> Result<Vec<Market>, SourceError> {
        let wires: Vec<GammaMarketWire> = self
            .transport
            .execute_json(self.request(&format!("/markets{}", query_string(&query.to_pairs()))))
            .await?;
        Ok(wires.into_iter().map(GammaMarketWire::into_market).collect())
    }

    /// Keyword search over question and slug of the active listing.
    pub async fn search_markets(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Market>, SourceError> {
        let listing = self
            .markets(&ListQuery {
                limit: 1000,
                active: Some(true),
                ..ListQuery::default()
            })
            .await?;

        let needle = keyword.to_lowercase();
        Ok(listing
            .into_iter()
            .filter(|market| {
                market
                    .question
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&needle)
                    || market.slug.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect())
    }

    pub async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, SourceError> {
        let query = query_string(&[("slug", slug.to_owned())]);
        let wires: Vec<GammaEventWire> = self
            .transport
            .execute_json(self.request(&format!("/events{query}")))
            .await?;
        Ok(wires.into_iter().next().map(GammaEventWire::into_event))
    }

    pub async fn events(&self, query: &ListQuery) -> Result<Vec<Event>, SourceError> {
        let wires: Vec<GammaEventWire> = self
            .transport
            .execute_json(self.request(&format!("/events{}", query_string(&query.to_pairs()))))
            .await?;
        Ok(wires.into_iter().map(GammaEventWire::into_event).collect())
    }
}

/// Decode a JSON-array-in-a-string field like `"[\"Yes\", \"No\"]"`.
fn decode_string_list(field: &str, raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(values) => values,
        Err(err) => {
            warn!(field, %err, "undecodable list field, treating as empty");
            Vec::new()
        }
    }
}

fn parse_lenient_date(raw: Option<String>) -> Option<UtcDateTime> {
    raw.and_then(|value| UtcDateTime::parse(&value).ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarketWire {
    #[serde(default)]
    slug: String,
    #[serde(default)]
    condition_id: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    outcomes: Option<String>,
    #[serde(default)]
    clob_token_ids: Option<String>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    closed: Option<bool>,
    #[serde(default)]
    archived: Option<bool>,
    #[serde(default)]
    volume: Option<Decimal>,
    #[serde(default)]
    liquidity: Option<Decimal>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    neg_risk: bool,
    #[serde(default, rename = "negRiskMarketID")]
    neg_risk_market_id: Option<String>,
    #[serde(default)]
    group_item_title: Option<String>,
}

impl GammaMarketWire {
    fn into_market(self) -> Market {
        Market {
            slug: self.slug,
            condition_id: self.condition_id.filter(|id| !id.is_empty()),
            question: self.question.filter(|q| !q.is_empty()),
            outcomes: decode_string_list("outcomes", self.outcomes),
            token_ids: decode_string_list("clobTokenIds", self.clob_token_ids),
            active: self.active,
            closed: self.closed,
            archived: self.archived,
            volume: self.volume,
            liquidity: self.liquidity,
            start_date: parse_lenient_date(self.start_date),
            end_date: parse_lenient_date(self.end_date),
            neg_risk: self.neg_risk,
            neg_risk_market_id: self.neg_risk_market_id.filter(|id| !id.is_empty()),
            group_item_title: self.group_item_title.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaEventWire {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    markets: Vec<GammaMarketWire>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    closed: Option<bool>,
    #[serde(default)]
    archived: Option<bool>,
    #[serde(default)]
    liquidity: Option<Decimal>,
    #[serde(default)]
    volume: Option<Decimal>,
    #[serde(default)]
    neg_risk: bool,
}

impl GammaEventWire {
    fn into_event(self) -> Event {
        // Event ids arrive as either a number or a string.
        let id = match self.id {
            serde_json::Value::String(id) => id,
            serde_json::Value::Number(id) => id.to_string(),
            _ => String::new(),
        };

        Event {
            id,
            slug: self.slug,
            ticker: self.ticker.filter(|t| !t.is_empty()),
            title: self.title.filter(|t| !t.is_empty()),
            markets: self
                .markets
                .into_iter()
                .map(GammaMarketWire::into_market)
                .collect(),
            active: self.active,
            closed: self.closed,
            archived: self.archived,
            liquidity: self.liquidity,
            volume: self.volume,
            neg_risk: self.neg_risk,
        }
    }
}
