//! `FeedState`: the merged view a UI renders from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::candle::CandleSeries;
use crate::domain::ticker::{Source, TickerSnapshot, TickerState};
use crate::shared::{Symbol, Timeframe};

/// Candles, latest ticker and connectivity for one `(symbol, timeframe)`.
///
/// `is_connected == false` means "live via polling", not "stale".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub candles: CandleSeries,
    pub ticker: TickerState,
    pub is_connected: bool,
    pub loading: bool,
    /// Most recent recoverable failure. Never clears existing data.
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub connection_attempts: u32,
}

impl FeedState {
    /// Fresh state for a new target, with history loading.
    pub fn loading(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self {
            candles: CandleSeries::new(timeframe.interval()),
            symbol,
            timeframe,
            loading: true,
            ..Self::default()
        }
    }

    pub fn ticker(&self) -> Option<&TickerSnapshot> {
        self.ticker.snapshot()
    }

    pub fn last_price(&self) -> Option<Decimal> {
        self.ticker.last_price()
    }

    /// Delta against the previously observed price, across both sources.
    pub fn price_change(&self) -> Decimal {
        self.ticker.price_change()
    }

    /// Source of the current ticker.
    pub fn source(&self) -> Option<Source> {
        self.ticker.source()
    }

    /// Whether any price has ever been obtained for this target.
    pub fn has_data(&self) -> bool {
        self.ticker.snapshot().is_some()
    }

    pub(crate) fn apply_ticker(&mut self, snapshot: TickerSnapshot, source: Source) {
        self.ticker.apply(snapshot, source);
        self.last_updated = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Interval;
    use rust_decimal_macros::dec;

    fn snapshot(price: Decimal) -> TickerSnapshot {
        TickerSnapshot {
            symbol: Symbol::new("BTCUSDT"),
            last_price: price,
            price_change: Decimal::ZERO,
            price_change_percent: Decimal::ZERO,
            open_price: price,
            high_price: price,
            low_price: price,
            volume: Decimal::ONE,
            quote_volume: price,
            event_time: None,
        }
    }

    #[test]
    fn test_loading_state() {
        let state = FeedState::loading(Symbol::new("ethusdt"), Timeframe::Weekly);
        assert!(state.loading);
        assert!(!state.is_connected);
        assert!(!state.has_data());
        assert_eq!(state.candles.interval(), Interval::Week1);
        assert_eq!(state.symbol.as_str(), "ETHUSDT");
    }

    #[test]
    fn test_apply_ticker_tracks_delta_and_source() {
        let mut state = FeedState::loading(Symbol::default(), Timeframe::Daily);
        state.apply_ticker(snapshot(dec!(100)), Source::Poll);
        assert_eq!(state.price_change(), Decimal::ZERO);
        assert_eq!(state.source(), Some(Source::Poll));
        assert!(state.last_updated.is_some());

        state.apply_ticker(snapshot(dec!(104.5)), Source::Stream);
        assert_eq!(state.price_change(), dec!(4.5));
        assert_eq!(state.source(), Some(Source::Stream));
        assert_eq!(state.last_price(), Some(dec!(104.5)));
    }
}
