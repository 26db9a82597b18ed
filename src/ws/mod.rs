//! Push-stream layer.
//!
//! - `transport`: `Transport`/`Socket` traits plus the `tokio-tungstenite` impl
//! - `connection`: `StreamConnection`: one socket, one topic, bounded reconnect
//! - `registry`: `ConnectionRegistry`: topic → connection map + circuit breaker
//!
//! This module defines the shared message, config and state types.

pub mod connection;
pub mod registry;
pub mod transport;

use crate::domain::ticker::wire::{WsMiniTicker, WsTicker};
use crate::domain::ticker::TickerSnapshot;
use crate::error::WsError;
use serde::Deserialize;
use std::time::Duration;

pub use connection::StreamConnection;
pub use registry::{ConnectionRegistry, StreamSubscription};
pub use transport::{Frame, Socket, Transport, TungsteniteTransport};

// ─── Inbound messages ────────────────────────────────────────────────────────

/// The type of inbound stream message, discriminated by the `e` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
pub enum Kind {
    #[serde(rename = "24hrTicker")]
    Ticker(WsTicker),
    #[serde(rename = "24hrMiniTicker")]
    MiniTicker(WsMiniTicker),
    /// Any event type this crate does not consume.
    #[serde(other)]
    Other,
}

impl Kind {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, WsError> {
        serde_json::from_str(text).map_err(|e| WsError::DeserializationError(e.to_string()))
    }

    /// The ticker snapshot carried by this message, if any.
    pub fn into_snapshot(self) -> Option<TickerSnapshot> {
        match self {
            Kind::Ticker(t) => Some(t.into()),
            Kind::MiniTicker(t) => Some(t.into()),
            Kind::Other => None,
        }
    }
}

// ─── Close codes ─────────────────────────────────────────────────────────────

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Reserved code reported when a socket ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Whether a close code ends the connection without reconnecting.
pub fn is_normal_close(code: Option<u16>) -> bool {
    matches!(code, Some(CLOSE_NORMAL) | Some(CLOSE_GOING_AWAY))
}

// ─── Connection state ────────────────────────────────────────────────────────

/// Lifecycle of one `StreamConnection`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Read-only status snapshot for health monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_open_and_not_fallback: bool,
    pub attempts: u32,
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Bounded exponential backoff for stream reconnects.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    /// Retries per topic before the process-wide breaker trips.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            multiplier: 1.5,
            max_attempts: 3,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        let ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exp);
        Duration::from_millis(ms.round() as u64)
    }
}

/// Configuration for stream connections.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Base stream URL; the topic's stream name is appended as a path segment.
    pub url: String,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl WsConfig {
    /// Full URL for one stream, e.g. `wss://host/ws/btcusdt@ticker`.
    pub fn stream_url(&self, topic: &crate::shared::Topic) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), topic.stream_name())
    }
}
