//! Real-time feed layer: REST polling with the push stream layered on top.
//!
//! - `timers`: `TimerSet`, the named cancellable tasks of one feed
//! - `polling`: `PollingFallback`, the REST ticker loop
//! - `state`: `FeedState`, what the UI renders
//! - `handle`: `FeedHandle`, the per-target controller
//!
//! `RealtimeFeed::subscribe` starts polling immediately, attempts a stream
//! as an enhancement, and keeps exactly one of them writing the ticker.

pub mod handle;
pub mod polling;
pub mod state;
pub mod timers;

use std::sync::Arc;
use std::time::Duration;

use crate::http::MarketDataSource;
use crate::shared::{DateRange, Symbol, Timeframe};
use crate::ws::ConnectionRegistry;

pub use handle::FeedHandle;
pub use polling::PollingFallback;
pub use state::FeedState;
pub use timers::{TimerKind, TimerSet};

/// Cadences for one feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub ticker_poll_interval: Duration,
    pub health_check_interval: Duration,
    /// Pause between `retry_connection()` and the polling restart.
    pub retry_delay: Duration,
    pub daily_refresh_interval: Duration,
    /// History refresh for weekly and monthly views.
    pub extended_refresh_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ticker_poll_interval: Duration::from_secs(10),
            health_check_interval: Duration::from_secs(3),
            retry_delay: Duration::from_secs(1),
            daily_refresh_interval: Duration::from_secs(5 * 60),
            extended_refresh_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl FeedConfig {
    pub fn history_refresh_interval(&self, timeframe: Timeframe) -> Duration {
        match timeframe {
            Timeframe::Daily => self.daily_refresh_interval,
            Timeframe::Weekly | Timeframe::Monthly => self.extended_refresh_interval,
        }
    }
}

/// Factory for feeds sharing one registry and one REST source.
#[derive(Clone)]
pub struct RealtimeFeed {
    pub(crate) source: Arc<dyn MarketDataSource>,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) config: FeedConfig,
}

impl RealtimeFeed {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        registry: ConnectionRegistry,
        config: FeedConfig,
    ) -> Self {
        Self {
            source,
            registry,
            config,
        }
    }

    /// Start a live feed for `symbol` at `timeframe`, optionally limited to `range`.
    ///
    /// An empty symbol resolves to the default instrument. Must be called
    /// within a Tokio runtime.
    pub fn subscribe(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        range: Option<DateRange>,
    ) -> FeedHandle {
        FeedHandle::start(self.clone(), symbol.or_default(), timeframe, range)
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadences() {
        let config = FeedConfig::default();
        assert_eq!(config.ticker_poll_interval, Duration::from_millis(10_000));
        assert_eq!(config.health_check_interval, Duration::from_millis(3_000));
        assert_eq!(
            config.history_refresh_interval(Timeframe::Daily),
            Duration::from_millis(300_000)
        );
        assert_eq!(
            config.history_refresh_interval(Timeframe::Monthly),
            Duration::from_millis(600_000)
        );
    }
}
