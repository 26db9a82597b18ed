//! Tickers sub-client: one-shot 24h snapshots.

use super::TickerSnapshot;
use crate::client::FeedClient;
use crate::error::FeedError;
use crate::shared::Symbol;

/// Sub-client for ticker operations.
pub struct Tickers<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Tickers<'a> {
    /// Fetch a fresh snapshot (never cached).
    pub async fn get(&self, symbol: &Symbol) -> Result<TickerSnapshot, FeedError> {
        Ok(self.client.source.get_ticker_snapshot(symbol).await?)
    }
}
