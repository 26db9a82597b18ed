//! Candle domain: OHLCV history and per-candle analytics.

pub mod client;
mod convert;
pub mod indicators;
pub mod state;
pub mod wire;

use crate::error::HttpError;
use crate::http::MarketDataSource;
use crate::shared::{DateRange, Interval, Symbol, Timeframe};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::CandleSeries;

/// Candles requested when no date window is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Upper bound accepted by the klines endpoint.
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// One OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
    pub trades: u64,
}

/// Direction of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Candle {
    /// Calendar date of the candle open (UTC).
    pub fn date(&self) -> NaiveDate {
        self.open_time.date_naive()
    }

    /// Close-vs-open change in percent.
    pub fn performance(&self) -> Decimal {
        if self.open.is_zero() {
            return Decimal::ZERO;
        }
        (self.close - self.open) / self.open * Decimal::ONE_HUNDRED
    }

    /// High-low range as a percentage of the open.
    pub fn volatility(&self) -> Decimal {
        if self.open.is_zero() {
            return Decimal::ZERO;
        }
        (self.high - self.low) / self.open * Decimal::ONE_HUNDRED
    }

    /// Performance normalized into `0..=1` (10% or more saturates).
    pub fn heatmap_intensity(&self) -> Decimal {
        (self.performance().abs() / Decimal::TEN).min(Decimal::ONE)
    }

    pub fn trend(&self) -> Trend {
        if self.performance() >= Decimal::ZERO {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

/// Number of candles to request so that `range` is covered with some margin.
pub fn history_limit(interval: Interval, range: Option<&DateRange>, today: NaiveDate) -> u32 {
    let Some(range) = range else {
        return DEFAULT_HISTORY_LIMIT;
    };

    let days = range.days_since_start(today);
    let limit = match interval {
        Interval::Day1 => (days + 30).max(100),
        Interval::Week1 => (days.div_ceil(7) + 10).max(52),
        Interval::Month1 => (days.div_ceil(30) + 6).max(24),
    };
    limit.min(MAX_HISTORY_LIMIT)
}

/// Fetch the candle history for a timeframe, sized and filtered to `range`.
pub async fn load_history(
    source: &dyn MarketDataSource,
    symbol: &Symbol,
    timeframe: Timeframe,
    range: Option<&DateRange>,
    today: NaiveDate,
) -> Result<CandleSeries, HttpError> {
    let interval = timeframe.interval();
    let limit = history_limit(interval, range, today);
    let candles = source.get_candles(symbol, interval, limit).await?;

    let mut series = CandleSeries::from_candles(interval, candles);
    if let Some(range) = range {
        let fetched = series.len();
        series.retain_range(range);
        tracing::debug!(
            %symbol,
            %interval,
            limit,
            fetched,
            kept = series.len(),
            "Filtered candle history to {}..={}",
            range.start,
            range.end
        );
    }
    Ok(series)
}
