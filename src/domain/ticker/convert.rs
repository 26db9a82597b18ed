//! Conversions from wire types to `TickerSnapshot`.

use super::wire::{Ticker24hrResponse, WsMiniTicker, WsTicker};
use super::TickerSnapshot;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

fn millis_to_time(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

impl From<Ticker24hrResponse> for TickerSnapshot {
    fn from(t: Ticker24hrResponse) -> Self {
        Self {
            symbol: t.symbol,
            last_price: t.last_price,
            price_change: t.price_change,
            price_change_percent: t.price_change_percent,
            open_price: t.open_price,
            high_price: t.high_price,
            low_price: t.low_price,
            volume: t.volume,
            quote_volume: t.quote_volume,
            event_time: t.close_time.and_then(millis_to_time),
        }
    }
}

impl From<WsTicker> for TickerSnapshot {
    fn from(t: WsTicker) -> Self {
        Self {
            symbol: t.symbol,
            last_price: t.last_price,
            price_change: t.price_change,
            price_change_percent: t.price_change_percent,
            open_price: t.open_price,
            high_price: t.high_price,
            low_price: t.low_price,
            volume: t.volume,
            quote_volume: t.quote_volume,
            event_time: millis_to_time(t.event_time),
        }
    }
}

impl From<WsMiniTicker> for TickerSnapshot {
    fn from(t: WsMiniTicker) -> Self {
        let price_change = t.last_price - t.open_price;
        let price_change_percent = if t.open_price.is_zero() {
            Decimal::ZERO
        } else {
            (price_change / t.open_price * Decimal::ONE_HUNDRED).round_dp(3)
        };

        Self {
            symbol: t.symbol,
            last_price: t.last_price,
            price_change,
            price_change_percent,
            open_price: t.open_price,
            high_price: t.high_price,
            low_price: t.low_price,
            volume: t.volume,
            quote_volume: t.quote_volume,
            event_time: millis_to_time(t.event_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rest_ticker_conversion() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "priceChange": "-94.99999800",
            "priceChangePercent": "-95.960",
            "weightedAvgPrice": "0.29628482",
            "prevClosePrice": "0.10002000",
            "lastPrice": "4.00000200",
            "lastQty": "200.00000000",
            "bidPrice": "4.00000000",
            "askPrice": "4.00000200",
            "openPrice": "99.00000000",
            "highPrice": "100.00000000",
            "lowPrice": "0.10000000",
            "volume": "8913.30000000",
            "quoteVolume": "15.30000000",
            "openTime": 1499783499040,
            "closeTime": 1499869899040,
            "firstId": 28385,
            "lastId": 28460,
            "count": 76
        }"#;
        let wire: Ticker24hrResponse = serde_json::from_str(json).unwrap();
        let snap: TickerSnapshot = wire.into();

        assert_eq!(snap.symbol.as_str(), "BTCUSDT");
        assert_eq!(snap.last_price, dec!(4.000002));
        assert_eq!(snap.price_change, dec!(-94.999998));
        assert_eq!(snap.price_change_percent, dec!(-95.96));
        assert_eq!(snap.quote_volume, dec!(15.3));
        assert_eq!(
            snap.event_time.map(|t| t.timestamp_millis()),
            Some(1499869899040)
        );
    }

    #[test]
    fn test_stream_ticker_uses_absolute_change_field() {
        let ws = WsTicker {
            event_time: 1_700_000_000_000,
            symbol: "BTCUSDT".into(),
            price_change: dec!(1250.5),
            price_change_percent: dec!(1.96),
            last_price: dec!(65000.00),
            open_price: dec!(63749.5),
            high_price: dec!(65500),
            low_price: dec!(63000),
            volume: dec!(12000),
            quote_volume: dec!(780000000),
        };
        let snap: TickerSnapshot = ws.into();
        assert_eq!(snap.price_change, dec!(1250.5));
        assert_eq!(snap.price_change_percent, dec!(1.96));
        assert_eq!(snap.last_price, dec!(65000));
    }

    #[test]
    fn test_mini_ticker_derives_change_from_open() {
        let ws = WsMiniTicker {
            event_time: 1_700_000_000_000,
            symbol: "ETHUSDT".into(),
            last_price: dec!(110),
            open_price: dec!(100),
            high_price: dec!(120),
            low_price: dec!(95),
            volume: dec!(10),
            quote_volume: dec!(1000),
        };
        let snap: TickerSnapshot = ws.into();
        assert_eq!(snap.price_change, dec!(10));
        assert_eq!(snap.price_change_percent, dec!(10));
    }

    #[test]
    fn test_mini_ticker_zero_open_has_zero_percent() {
        let ws = WsMiniTicker {
            event_time: 0,
            symbol: "NEWUSDT".into(),
            last_price: dec!(1),
            open_price: Decimal::ZERO,
            high_price: dec!(1),
            low_price: dec!(1),
            volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
        };
        let snap: TickerSnapshot = ws.into();
        assert_eq!(snap.price_change_percent, Decimal::ZERO);
    }
}
