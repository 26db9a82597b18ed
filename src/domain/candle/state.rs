//! Candle series container: replaced wholesale on every refresh.

use super::{indicators, Candle};
use crate::shared::{DateRange, Interval};
use rust_decimal::Decimal;

/// Ordered OHLCV history (ascending open time) for one interval.
///
/// Ticker updates never touch this; it only changes through `replace`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    interval: Interval,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            candles: Vec::new(),
        }
    }

    pub fn from_candles(interval: Interval, candles: Vec<Candle>) -> Self {
        let mut series = Self::new(interval);
        series.replace(candles);
        series
    }

    /// Replace all candles, restoring ascending order.
    pub fn replace(&mut self, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.open_time);
        self.candles = candles;
    }

    /// Keep only candles whose open date falls inside `range`.
    pub fn retain_range(&mut self, range: &DateRange) {
        self.candles.retain(|c| range.contains(c.date()));
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Relative strength index over the most recent closes.
    pub fn rsi(&self, period: usize) -> Decimal {
        indicators::rsi(&self.closes(), period)
    }

    /// Simple moving average over the most recent closes.
    pub fn moving_average(&self, period: usize) -> Decimal {
        indicators::simple_moving_average(&self.closes(), period)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }
}
