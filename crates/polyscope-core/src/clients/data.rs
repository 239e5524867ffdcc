//! Client for the portfolio/activity source (wallet-keyed data).

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::clients::{query_string, SourceError};
use crate::http_client::HttpRequest;
use crate::transport::Transport;

/// Hard listing cap enforced by the provider.
const MAX_POSITIONS_LIMIT: u32 = 500;

/// A wallet's current position in one market outcome.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    #[serde(default)]
    pub current_value: Decimal,
    #[serde(default)]
    pub cash_pnl: Decimal,
    #[serde(default)]
    pub percent_pnl: Decimal,
    #[serde(default)]
    pub redeemable: bool,
}

/// One on-chain action of a wallet (trade, split, merge, redeem).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub usdc_size: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// One holder of a market outcome token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    #[serde(default, rename = "proxyWallet")]
    pub wallet: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub outcome_index: Option<u32>,
}

/// One executed trade of a wallet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub price: Decimal,
}

/// One sample of a wallet's total holdings value over time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsPoint {
    #[serde(default, rename = "t")]
    pub timestamp: i64,
    #[serde(default, rename = "v")]
    pub value: Decimal,
}

/// Filters for the positions listing.
#[derive(Debug, Clone)]
pub struct PositionQuery {
    pub address: String,
    pub min_size: Decimal,
    pub market: Option<String>,
    pub event: Option<String>,
    pub redeemable: Option<bool>,
    pub limit: u32,
    pub offset: u32,
    pub sort_by: String,
    pub sort_order: String,
}

impl PositionQuery {
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            min_size: Decimal::ONE,
            market: None,
            event: None,
            redeemable: None,
            limit: 50,
            offset: 0,
            sort_by: String::from("VALUE"),
            sort_order: String::from("DESC"),
        }
    }
}

/// Filters for the activity listing.
#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub address: String,
    pub activity_types: Vec<String>,
    pub side: Option<String>,
    pub market: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl ActivityQuery {
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            activity_types: Vec::new(),
            side: None,
            market: None,
            limit: 100,
            offset: 0,
        }
    }
}

#[derive(Clone)]
pub struct DataClient {
    transport: Transport,
    base_url: String,
    timeout_ms: u64,
}

impl DataClient {
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

    /// Current positions for a wallet. `market` and `event` filters are
    /// mutually exclusive.
    pub async fn positions(&self, query: &PositionQuery) -> Result<Vec<Position>, SourceError> {
        if query.market.is_some() && query.event.is_some() {
            return Err(SourceError::invalid_request(
                "market and event filters cannot be combined",
            ));
        }

        let mut pairs = vec![
            ("address", query.address.clone()),
            ("min_size", query.min_size.to_string()),
            ("limit", query.limit.min(MAX_POSITIONS_LIMIT).to_string()),
            ("offset", query.offset.to_string()),
            ("sort_by", query.sort_by.clone()),
            ("sort_order", query.sort_order.clone()),
        ];
        if let Some(redeemable) = query.redeemable {
            pairs.push(("redeemable", redeemable.to_string()));
        }
        if let Some(market) = &query.market {
            pairs.push(("market", market.clone()));
        }
        if let Some(event) = &query.event {
            pairs.push(("event", event.clone()));
        }

        self.transport
            .execute_json(self.request(&format!("/positions{}", query_string(&pairs))))
            .await
            .map_err(SourceError::from)
    }

    /// On-chain activity history for a wallet.
    pub async fn activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityRecord>, SourceError> {
        let mut pairs = vec![
            ("address", query.address.clone()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if !query.activity_types.is_empty() {
            pairs.push(("activity_types", query.activity_types.join(",")));
        }
        if let Some(side) = &query.side {
            pairs.push(("side", side.clone()));
        }
        if let Some(market) = &query.market {
            pairs.push(("market", market.clone()));
        }

        self.transport
            .execute_json(self.request(&format!("/activity{}", query_string(&pairs))))
            .await
            .map_err(SourceError::from)
    }

    /// Top holders of a market, optionally filtered to one outcome.
    pub async fn holders(
        &self,
        condition_id: &str,
        outcome: Option<&str>,
        min_size: Decimal,
        limit: u32,
    ) -> Result<Vec<Holder>, SourceError> {
        let mut pairs = vec![
            ("market_id", condition_id.to_owned()),
            ("min_size", min_size.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(outcome) = outcome {
            pairs.push(("outcome", outcome.to_owned()));
        }

        self.transport
            .execute_json(self.request(&format!("/holders{}", query_string(&pairs))))
            .await
            .map_err(SourceError::from)
    }

    /// Trades executed by a wallet, optionally bounded in time.
    pub async fn trades(
        &self,
        address: &str,
        market: Option<&str>,
        start_ts: Option<i64>,
        end_ts: Option<i64>,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, SourceError> {
        let mut pairs = vec![
            ("address", address.to_owned()),
            ("limit", limit.to_string()),
        ];
        if let Some(market) = market {
            pairs.push(("market", market.to_owned()));
        }
        if let Some(start_ts) = start_ts {
            pairs.push(("start_ts", start_ts.to_string()));
        }
        if let Some(end_ts) = end_ts {
            pairs.push(("end_ts", end_ts.to_string()));
        }

        self.transport
            .execute_json(self.request(&format!("/trades{}", query_string(&pairs))))
            .await
            .map_err(SourceError::from)
    }

    /// Historical total holdings value for a wallet.
    pub async fn holdings_value(
        &self,
        address: &str,
        interval: &str,
    ) -> Result<Vec<HoldingsPoint>, SourceError> {
        let pairs = vec![
            ("address", address.to_owned()),
            ("interval", interval.to_owned()),
        ];

        self.transport
            .execute_json(self.request(&format!("/holdings-value{}", query_string(&pairs))))
            .await
            .map_err(SourceError::from)
    }
}
