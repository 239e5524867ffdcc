use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::UtcDateTime;

/// Longest slug-derived column prefix before truncation.
const MAX_PREFIX_LEN: usize = 20;

/// A single prediction market, reconciled across metadata and trading
/// sources.
///
/// Identity is `condition_id` when present, falling back to `slug`; two
/// records with the same identity describe the same market even when they
/// came from different sources with different field coverage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub slug: String,
    pub condition_id: Option<String>,
    pub question: Option<String>,
    pub outcomes: Vec<String>,
    pub token_ids: Vec<String>,
    pub active: Option<bool>,
    pub closed: Option<bool>,
    pub archived: Option<bool>,
    pub volume: Option<Decimal>,
    pub liquidity: Option<Decimal>,
    pub start_date: Option<UtcDateTime>,
    pub end_date: Option<UtcDateTime>,
    pub neg_risk: bool,
    pub neg_risk_market_id: Option<String>,
    pub group_item_title: Option<String>,
}

impl Market {
    /// Stable identity key: condition id when known, otherwise the slug.
    pub fn identity(&self) -> &str {
        self.condition_id.as_deref().unwrap_or(&self.slug)
    }

    /// Outcome/token pairs, truncated to the shorter of the two lists.
    pub fn outcome_tokens(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .zip(self.token_ids.iter())
            .map(|(outcome, token)| (outcome.as_str(), token.as_str()))
    }

    /// Placeholder entries in negative-risk market groups carry the group
    /// linkage but no tradeable tokens; they hold no data worth fetching.
    pub fn is_inactive_neg_risk_option(&self) -> bool {
        self.neg_risk
            && self.neg_risk_market_id.is_some()
            && (self.token_ids.is_empty() || self.token_ids.iter().all(|tid| tid.is_empty()))
    }

    /// Short name used to prefix export columns for this market.
    ///
    /// Prefers the group item title (team names in grouped sports markets),
    /// then the subject after "will" in the slug, then the truncated slug.
    pub fn column_prefix(&self) -> String {
        if let Some(title) = self.group_item_title.as_deref() {
            if !title.is_empty() {
                return title.to_lowercase().replace(' ', "_");
            }
        }

        let parts: Vec<&str> = self.slug.split('-').collect();
        if let Some(idx) = parts.iter().position(|part| *part == "will") {
            if let Some(subject) = parts.get(idx + 1) {
                return (*subject).to_owned();
            }
        }

        self.slug.chars().take(MAX_PREFIX_LEN).collect()
    }

    /// Fill in fields of `self` from `other`, with `other` winning wherever
    /// it has a value. Field-by-field; identity fields are never blanked.
    pub fn merge_from(&mut self, other: Market) {
        if !other.slug.is_empty() {
            self.slug = other.slug;
        }
        if other.condition_id.is_some() {
            self.condition_id = other.condition_id;
        }
        if other.question.is_some() {
            self.question = other.question;
        }
        if !other.outcomes.is_empty() {
            self.outcomes = other.outcomes;
        }
        if !other.token_ids.is_empty() {
            self.token_ids = other.token_ids;
        }
        if other.active.is_some() {
            self.active = other.active;
        }
        if other.closed.is_some() {
            self.closed = other.closed;
        }
        if other.archived.is_some() {
            self.archived = other.archived;
        }
        if other.volume.is_some() {
            self.volume = other.volume;
        }
        if other.liquidity.is_some() {
            self.liquidity = other.liquidity;
        }
        if other.start_date.is_some() {
            self.start_date = other.start_date;
        }
        if other.end_date.is_some() {
            self.end_date = other.end_date;
        }
        if other.neg_risk {
            self.neg_risk = true;
        }
        if other.neg_risk_market_id.is_some() {
            self.neg_risk_market_id = other.neg_risk_market_id;
        }
        if other.group_item_title.is_some() {
            self.group_item_title = other.group_item_title;
        }
    }

    /// Merge two records for the same market; `later` wins per present field.
    pub fn merged(mut self, later: Market) -> Market {
        self.merge_from(later);
        self
    }
}

/// A grouping of related markets (e.g. all candidates in one election).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub slug: String,
    pub ticker: Option<String>,
    pub title: Option<String>,
    pub markets: Vec<Market>,
    pub active: Option<bool>,
    pub closed: Option<bool>,
    pub archived: Option<bool>,
    pub liquidity: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub neg_risk: bool,
}

impl Event {
    /// Markets worth fetching data for: skips neg-risk placeholders.
    pub fn tradeable_markets(&self) -> impl Iterator<Item = &Market> {
        self.markets
            .iter()
            .filter(|market| !market.is_inactive_neg_risk_option())
    }
}
