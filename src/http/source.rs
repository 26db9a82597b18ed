//! `MarketDataSource`: the REST seam the feed and sub-clients depend on.

use crate::domain::candle::Candle;
use crate::domain::ticker::TickerSnapshot;
use crate::error::HttpError;
use crate::http::BinanceHttp;
use crate::shared::{Interval, Symbol};
use async_trait::async_trait;

/// One-shot market-data fetches, already converted to domain types.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Up to `limit` candles, ascending by open time.
    async fn get_candles(
        &self,
        symbol: &Symbol,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, HttpError>;

    /// A fresh 24h rolling-window snapshot.
    async fn get_ticker_snapshot(&self, symbol: &Symbol) -> Result<TickerSnapshot, HttpError>;
}

#[async_trait]
impl MarketDataSource for BinanceHttp {
    async fn get_candles(
        &self,
        symbol: &Symbol,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, HttpError> {
        self.get_klines(symbol, interval, limit)
            .await?
            .into_iter()
            .map(Candle::try_from)
            .collect()
    }

    async fn get_ticker_snapshot(&self, symbol: &Symbol) -> Result<TickerSnapshot, HttpError> {
        Ok(self.get_ticker_24hr(symbol).await?.into())
    }
}
