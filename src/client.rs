//! High-level client: `FeedClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder, the shared registry, and accessor methods.

use crate::domain::candle::client::Candles;
use crate::domain::ticker::client::Tickers;
use crate::error::FeedError;
use crate::feed::{FeedConfig, RealtimeFeed};
use crate::http::{BinanceHttp, MarketDataSource, RetryPolicy};
use crate::ws::{ConnectionRegistry, Transport, TungsteniteTransport, WsConfig};

use std::sync::Arc;

// Re-export sub-client types for convenience.
pub use crate::domain::candle::client::Candles as CandlesClient;
pub use crate::domain::ticker::client::Tickers as TickersClient;

/// The primary entry point.
///
/// Owns one `ConnectionRegistry` and one `MarketDataSource`; every feed
/// created through `realtime()` shares them. Call `dispose()` at shutdown.
pub struct FeedClient {
    pub(crate) source: Arc<dyn MarketDataSource>,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) realtime: RealtimeFeed,
}

impl FeedClient {
    pub fn builder() -> FeedClientBuilder {
        FeedClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn tickers(&self) -> Tickers<'_> {
        Tickers { client: self }
    }

    pub fn candles(&self) -> Candles<'_> {
        Candles { client: self }
    }

    /// Live feeds: `client.realtime().subscribe(symbol, timeframe, range)`.
    pub fn realtime(&self) -> &RealtimeFeed {
        &self.realtime
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Close every stream connection. Feeds still alive fall back to polling.
    pub fn dispose(&self) {
        self.registry.cleanup();
    }
}

impl Clone for FeedClient {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            registry: self.registry.clone(),
            realtime: self.realtime.clone(),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct FeedClientBuilder {
    api_url: String,
    ws_config: WsConfig,
    feed_config: FeedConfig,
    retry: RetryPolicy,
    source: Option<Arc<dyn MarketDataSource>>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for FeedClientBuilder {
    fn default() -> Self {
        Self {
            api_url: crate::network::DEFAULT_API_URL.to_string(),
            ws_config: WsConfig::default(),
            feed_config: FeedConfig::default(),
            retry: RetryPolicy::default(),
            source: None,
            transport: None,
        }
    }
}

impl FeedClientBuilder {
    pub fn api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_config.url = url.to_string();
        self
    }

    pub fn ws_config(mut self, config: WsConfig) -> Self {
        self.ws_config = config;
        self
    }

    pub fn feed_config(mut self, config: FeedConfig) -> Self {
        self.feed_config = config;
        self
    }

    /// Retry policy for the default REST source.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the REST source (the `api_url` and `retry` settings are then unused).
    pub fn source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the stream transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<FeedClient, FeedError> {
        if self.ws_config.url.trim().is_empty() {
            return Err(FeedError::Validation("ws_url must not be empty".into()));
        }

        let source: Arc<dyn MarketDataSource> = match self.source {
            Some(source) => source,
            None => {
                if self.api_url.trim().is_empty() {
                    return Err(FeedError::Validation("api_url must not be empty".into()));
                }
                Arc::new(BinanceHttp::new(&self.api_url)?.with_retry(self.retry))
            }
        };
        let transport: Arc<dyn Transport> = self
            .transport
            .unwrap_or_else(|| Arc::new(TungsteniteTransport));

        let registry = ConnectionRegistry::new(self.ws_config, transport);
        let realtime = RealtimeFeed::new(Arc::clone(&source), registry.clone(), self.feed_config);

        Ok(FeedClient {
            source,
            registry,
            realtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let client = FeedClient::builder().build().unwrap();
        assert_eq!(client.registry().config().url, crate::network::DEFAULT_WS_URL);
        assert_eq!(client.registry().live_connections(), 0);
        assert!(!client.registry().is_fallback_mode());
    }

    #[test]
    fn test_build_rejects_empty_urls() {
        assert!(matches!(
            FeedClient::builder().ws_url("  ").build(),
            Err(FeedError::Validation(_))
        ));
        assert!(matches!(
            FeedClient::builder().api_url("").build(),
            Err(FeedError::Validation(_))
        ));
    }
}
