//! `PollingFallback`: REST ticker fetches on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::domain::ticker::TickerSnapshot;
use crate::error::HttpError;
use crate::feed::timers::{TimerKind, TimerSet};
use crate::http::MarketDataSource;
use crate::shared::Symbol;

/// Poll loop for one instrument, scheduled on the feed's `TimerSet`.
pub struct PollingFallback {
    source: Arc<dyn MarketDataSource>,
    symbol: Symbol,
    interval: Duration,
    timers: TimerSet,
}

impl PollingFallback {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        symbol: Symbol,
        interval: Duration,
        timers: TimerSet,
    ) -> Self {
        Self {
            source,
            symbol,
            interval,
            timers,
        }
    }

    /// Fetch now, then every `interval`. A failed fetch never ends the loop.
    ///
    /// No-op when already running; returns whether a new loop started.
    pub fn start<F>(&self, on_result: F) -> bool
    where
        F: Fn(Result<TickerSnapshot, HttpError>) + Send + Sync + 'static,
    {
        let source = Arc::clone(&self.source);
        let symbol = self.symbol.clone();
        let interval = self.interval;

        let started = self.timers.spawn_if_absent(TimerKind::Poll, async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = source.get_ticker_snapshot(&symbol).await;
                match &result {
                    Ok(snapshot) => {
                        tracing::debug!(%symbol, price = %snapshot.last_price, "Polled ticker")
                    }
                    Err(e) => tracing::warn!(%symbol, "Ticker poll failed: {}", e),
                }
                on_result(result);
            }
        });

        if started {
            tracing::info!(
                symbol = %self.symbol,
                interval_ms = interval.as_millis() as u64,
                "Polling started"
            );
        }
        started
    }

    /// Cancel the loop, including any fetch in flight. Safe when not started.
    pub fn stop(&self) -> bool {
        let stopped = self.timers.cancel(TimerKind::Poll);
        if stopped {
            tracing::info!(symbol = %self.symbol, "Polling stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.timers.is_active(TimerKind::Poll)
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
}
