//! Candles sub-client: raw klines and window-sized history.

use super::{load_history, Candle, CandleSeries};
use crate::client::FeedClient;
use crate::error::FeedError;
use crate::shared::{DateRange, Interval, Symbol, Timeframe};
use chrono::Utc;

/// Sub-client for candle history.
pub struct Candles<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Candles<'a> {
    pub async fn get(
        &self,
        symbol: &Symbol,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, FeedError> {
        Ok(self
            .client
            .source
            .get_candles(symbol, interval, limit)
            .await?)
    }

    /// History for a dashboard timeframe, sized to cover `range` and filtered to it.
    pub async fn history(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        range: Option<DateRange>,
    ) -> Result<CandleSeries, FeedError> {
        let today = Utc::now().date_naive();
        Ok(load_history(
            self.client.source.as_ref(),
            symbol,
            timeframe,
            range.as_ref(),
            today,
        )
        .await?)
    }
}
