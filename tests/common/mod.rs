//! Scripted in-memory `Transport` and `MarketDataSource` for integration tests.
//!
//! Tests run under tokio's paused clock, so every delay here is virtual.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::Instant;

use realtime_feed::client::FeedClient;
use realtime_feed::domain::candle::Candle;
use realtime_feed::domain::ticker::TickerSnapshot;
use realtime_feed::error::{HttpError, WsError};
use realtime_feed::http::MarketDataSource;
use realtime_feed::shared::{Interval, Symbol};
use realtime_feed::ws::{Frame, Socket, Transport};

// ─── Clock helpers ───────────────────────────────────────────────────────────

/// Let every ready task run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Sleep until `ms` after `start`.
pub async fn at(start: Instant, ms: u64) {
    tokio::time::sleep_until(start + Duration::from_millis(ms)).await;
}

// ─── Payloads ────────────────────────────────────────────────────────────────

pub fn snapshot(symbol: &str, price: Decimal) -> TickerSnapshot {
    TickerSnapshot {
        symbol: Symbol::new(symbol),
        last_price: price,
        price_change: Decimal::ZERO,
        price_change_percent: Decimal::ZERO,
        open_price: price,
        high_price: price,
        low_price: price,
        volume: Decimal::ONE,
        quote_volume: price,
        event_time: None,
    }
}

/// A `24hrTicker` stream frame.
pub fn ticker_frame(symbol: &str, price: &str) -> String {
    format!(
        r#"{{"e":"24hrTicker","E":1710000000000,"s":"{symbol}","p":"100.00","P":"0.154","c":"{price}","o":"64900.00","h":"65500.00","l":"64000.00","v":"1000.5","q":"65000000.0"}}"#
    )
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// What the next `connect` call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Open a socket the test can drive through a `ServerHandle`.
    Accept,
    /// Fail the handshake with an abnormal close.
    Refuse,
    /// Never complete, so the connect timeout fires.
    Hang,
}

/// Server side of one accepted socket.
#[derive(Clone)]
pub struct ServerHandle {
    url: String,
    tx: mpsc::UnboundedSender<Frame>,
    sent: Arc<Mutex<Vec<Frame>>>,
}

impl ServerHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.tx.send(Frame::Text(text.into()));
    }

    pub fn push_ticker(&self, symbol: &str, price: &str) {
        self.push_text(ticker_frame(symbol, price));
    }

    pub fn push(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }

    pub fn close(&self, code: u16) {
        self.push(Frame::Close {
            code: Some(code),
            reason: "server close".into(),
        });
    }

    /// Frames the client sent on this socket.
    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }
}

struct MockSocket {
    rx: mpsc::UnboundedReceiver<Frame>,
    sent: Arc<Mutex<Vec<Frame>>>,
    open: Arc<AtomicUsize>,
}

#[async_trait]
impl Socket for MockSocket {
    async fn recv(&mut self) -> Option<Result<Frame, WsError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn send(&mut self, frame: Frame) -> Result<(), WsError> {
        self.sent.lock().push(frame);
        Ok(())
    }
}

impl Drop for MockSocket {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockTransport {
    script: Mutex<VecDeque<Outcome>>,
    default: Mutex<Outcome>,
    connects: AtomicUsize,
    open: Arc<AtomicUsize>,
    servers: Mutex<Vec<ServerHandle>>,
    urls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new(default: Outcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            default: Mutex::new(default),
            connects: AtomicUsize::new(0),
            open: Arc::new(AtomicUsize::new(0)),
            servers: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(Outcome::Accept)
    }

    pub fn refusing() -> Arc<Self> {
        Self::new(Outcome::Refuse)
    }

    /// Queue outcomes for the next connects, ahead of the default.
    pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.script.lock().extend(outcomes);
    }

    pub fn set_default(&self, outcome: Outcome) {
        *self.default.lock() = outcome;
    }

    /// Connect attempts so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Sockets accepted and not yet dropped by the client.
    pub fn open_sockets(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Server side of the `n`th accepted socket.
    pub fn server(&self, n: usize) -> ServerHandle {
        self.servers.lock()[n].clone()
    }

    pub fn last_server(&self) -> ServerHandle {
        self.servers
            .lock()
            .last()
            .cloned()
            .expect("no socket accepted yet")
    }

    pub fn accepted(&self) -> usize {
        self.servers.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, WsError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(*self.default.lock());

        match outcome {
            Outcome::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                let sent = Arc::new(Mutex::new(Vec::new()));
                self.servers.lock().push(ServerHandle {
                    url: url.to_string(),
                    tx,
                    sent: Arc::clone(&sent),
                });
                self.open.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(MockSocket {
                    rx,
                    sent,
                    open: Arc::clone(&self.open),
                }))
            }
            Outcome::Refuse => Err(WsError::Closed {
                code: Some(1006),
                reason: "abnormal closure".into(),
            }),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

// ─── REST source ─────────────────────────────────────────────────────────────

/// Scripted ticker response: arrives after `delay` with `result`.
pub struct Scripted {
    pub delay: Duration,
    pub result: Result<TickerSnapshot, HttpError>,
}

pub struct MockSource {
    price: Mutex<Decimal>,
    ticker_delay: Mutex<Duration>,
    script: Mutex<VecDeque<Scripted>>,
    fail_tickers: AtomicBool,
    fail_candles: AtomicBool,
    ticker_calls: AtomicUsize,
    candle_calls: AtomicUsize,
    candle_count: usize,
}

impl MockSource {
    pub fn new(price: Decimal) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(price),
            ticker_delay: Mutex::new(Duration::ZERO),
            script: Mutex::new(VecDeque::new()),
            fail_tickers: AtomicBool::new(false),
            fail_candles: AtomicBool::new(false),
            ticker_calls: AtomicUsize::new(0),
            candle_calls: AtomicUsize::new(0),
            candle_count: 30,
        })
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock() = price;
    }

    pub fn set_ticker_delay(&self, delay: Duration) {
        *self.ticker_delay.lock() = delay;
    }

    /// Queue one response for the next ticker call.
    pub fn script_ticker(&self, delay: Duration, result: Result<TickerSnapshot, HttpError>) {
        self.script.lock().push_back(Scripted { delay, result });
    }

    pub fn fail_tickers(&self, fail: bool) {
        self.fail_tickers.store(fail, Ordering::SeqCst);
    }

    pub fn fail_candles(&self, fail: bool) {
        self.fail_candles.store(fail, Ordering::SeqCst);
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    pub fn candle_calls(&self) -> usize {
        self.candle_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    async fn get_candles(
        &self,
        _symbol: &Symbol,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, HttpError> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_candles.load(Ordering::SeqCst) {
            return Err(HttpError::ServerError {
                status: 500,
                body: "internal error".into(),
            });
        }

        let step = match interval {
            Interval::Day1 => 1,
            Interval::Week1 => 7,
            Interval::Month1 => 30,
        };
        let today = Utc::now().date_naive();
        let count = self.candle_count.min(limit as usize);
        Ok((0..count)
            .rev()
            .map(|i| {
                let date = today - ChronoDuration::days((i * step) as i64);
                let open_time = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
                let close = Decimal::from(60_000 + i as i64 * 10);
                Candle {
                    open_time,
                    close_time: open_time + ChronoDuration::days(step as i64),
                    open: close - Decimal::TEN,
                    high: close + Decimal::ONE_HUNDRED,
                    low: close - Decimal::ONE_HUNDRED,
                    close,
                    volume: Decimal::ONE,
                    quote_volume: close,
                    trades: 10,
                }
            })
            .collect())
    }

    async fn get_ticker_snapshot(&self, symbol: &Symbol) -> Result<TickerSnapshot, HttpError> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.script.lock().pop_front();
        if let Some(Scripted { delay, result }) = scripted {
            tokio::time::sleep(delay).await;
            return result;
        }

        let delay = *self.ticker_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_tickers.load(Ordering::SeqCst) {
            return Err(HttpError::ServerError {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let price = *self.price.lock();
        Ok(snapshot(symbol.as_str(), price))
    }
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub fn client(transport: &Arc<MockTransport>, source: &Arc<MockSource>) -> FeedClient {
    FeedClient::builder()
        .ws_url("wss://stream.test/ws")
        .transport(Arc::clone(transport) as Arc<dyn Transport>)
        .source(Arc::clone(source) as Arc<dyn MarketDataSource>)
        .build()
        .expect("client should build")
}
