//! Ticker domain: 24h rolling-window snapshot for one instrument.

pub mod client;
mod convert;
pub mod state;
pub mod wire;

use crate::shared::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::TickerState;

/// Last-known-good market snapshot for an instrument.
///
/// Every write replaces the whole snapshot; fields from different sources are
/// never mixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: Symbol,
    pub last_price: Decimal,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
    /// Exchange-side time of the snapshot, when the payload carries one.
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
}

/// Which delivery path produced a ticker write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Stream,
    Poll,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Stream => write!(f, "stream"),
            Source::Poll => write!(f, "poll"),
        }
    }
}
