//! # realtime-feed
//!
//! Live ticker and candle data for a crypto dashboard: REST polling that
//! starts immediately, a push stream layered on top as an enhancement, and a
//! single merged state for the UI.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Newtypes, domain slices (ticker, candle), errors
//! 2. **HTTP API**: `BinanceHttp` with retry policies, behind `MarketDataSource`
//! 3. **Stream**: `Transport` seam, `StreamConnection`, `ConnectionRegistry`
//! 4. **Feed**: `PollingFallback`, `TimerSet`, `FeedHandle` / `FeedState`
//! 5. **High-Level Client**: `FeedClient` with nested sub-clients
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use realtime_feed::prelude::*;
//!
//! let client = FeedClient::builder().build()?;
//!
//! let ticker = client.tickers().get(&Symbol::new("BTCUSDT")).await?;
//!
//! let feed = client
//!     .realtime()
//!     .subscribe(Symbol::new("BTCUSDT"), Timeframe::Daily, None);
//! let mut updates = feed.watch();
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow().clone();
//!     println!("{:?} live={}", state.last_price(), state.is_connected);
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: HTTP API ────────────────────────────────────────────────────────

/// REST client with retry policies.
pub mod http;

// ── Layer 3: Stream ──────────────────────────────────────────────────────────

/// Push-stream transport, connections and the connection registry.
pub mod ws;

// ── Layer 4: Feed ────────────────────────────────────────────────────────────

/// Per-target orchestration: polling fallback, health monitor, merged state.
pub mod feed;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// `FeedClient`: the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{DateRange, Interval, StreamKind, Symbol, Timeframe, Topic};

    // Domain types
    pub use crate::domain::candle::{Candle, CandleSeries, Trend};
    pub use crate::domain::ticker::{Source, TickerSnapshot, TickerState};

    // Errors
    pub use crate::error::{FeedError, HttpError, WsError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_WS_URL};

    // HTTP
    pub use crate::http::{BinanceHttp, MarketDataSource, RetryConfig, RetryPolicy};

    // Stream
    pub use crate::ws::{
        ConnectionRegistry, ConnectionState, ConnectionStatus, ReconnectPolicy,
        StreamSubscription, Transport, WsConfig,
    };

    // Feed
    pub use crate::feed::{FeedConfig, FeedHandle, FeedState, RealtimeFeed};

    // Client + sub-clients
    pub use crate::client::{CandlesClient, FeedClient, FeedClientBuilder, TickersClient};
}
