//! Wire types for klines (REST).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One kline as returned by `GET /klines`: a positional JSON array.
///
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume,
///   trades, takerBuyBase, takerBuyQuote, ignore]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestKline(
    pub i64,
    pub Decimal,
    pub Decimal,
    pub Decimal,
    pub Decimal,
    pub Decimal,
    pub i64,
    pub Decimal,
    pub u64,
    pub Decimal,
    pub Decimal,
    #[serde(default)] pub serde_json::Value,
);
