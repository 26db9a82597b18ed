//! Wire types for ticker data (REST + stream).

use crate::shared::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── REST wire types ─────────────────────────────────────────────────────────

/// REST response for `GET /ticker/24hr`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hrResponse {
    pub symbol: Symbol,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    #[serde(default)]
    pub weighted_avg_price: Option<Decimal>,
    #[serde(default)]
    pub prev_close_price: Option<Decimal>,
    pub last_price: Decimal,
    #[serde(default)]
    pub bid_price: Option<Decimal>,
    #[serde(default)]
    pub ask_price: Option<Decimal>,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
    #[serde(default)]
    pub open_time: Option<i64>,
    #[serde(default)]
    pub close_time: Option<i64>,
    #[serde(default)]
    pub count: Option<u64>,
}

// ─── Stream wire types ───────────────────────────────────────────────────────

/// `24hrTicker` stream payload (single-letter exchange field names).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsTicker {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: Symbol,
    #[serde(rename = "p")]
    pub price_change: Decimal,
    #[serde(rename = "P")]
    pub price_change_percent: Decimal,
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "o")]
    pub open_price: Decimal,
    #[serde(rename = "h")]
    pub high_price: Decimal,
    #[serde(rename = "l")]
    pub low_price: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "q")]
    pub quote_volume: Decimal,
}

/// `24hrMiniTicker` stream payload. Carries no change fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsMiniTicker {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: Symbol,
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "o")]
    pub open_price: Decimal,
    #[serde(rename = "h")]
    pub high_price: Decimal,
    #[serde(rename = "l")]
    pub low_price: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "q")]
    pub quote_volume: Decimal,
}
