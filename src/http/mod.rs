//! HTTP client layer: `BinanceHttp` plus the `MarketDataSource` seam.

pub mod client;
pub mod retry;
pub mod source;

pub use client::BinanceHttp;
pub use retry::{RetryConfig, RetryPolicy};
pub use source::MarketDataSource;
