//! Network URL constants.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.binance.com/api/v3";

/// Default push-stream base URL. Topics are appended as `/{stream_name}`.
pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443/ws";
