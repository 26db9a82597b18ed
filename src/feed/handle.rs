//! `FeedHandle`: the live controller for one `(symbol, timeframe)` target.
//!
//! Each target runs as a `FeedSession`: its own timers, poll loop and stream
//! listener, all writing into one shared `watch` channel. `retarget` tears a
//! session down and starts the next one on the same channel, so observers
//! keep their receiver across instrument changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::candle;
use crate::domain::ticker::{Source, TickerSnapshot};
use crate::error::HttpError;
use crate::feed::polling::PollingFallback;
use crate::feed::state::FeedState;
use crate::feed::timers::{TimerKind, TimerSet};
use crate::feed::RealtimeFeed;
use crate::shared::{DateRange, Symbol, Timeframe, Topic};
use crate::ws::StreamSubscription;

// ─── Session ─────────────────────────────────────────────────────────────────

struct FeedSession {
    topic: Topic,
    timeframe: Timeframe,
    range: Option<DateRange>,
    feed: RealtimeFeed,
    timers: TimerSet,
    polling: PollingFallback,
    state: Arc<watch::Sender<FeedState>>,
    stream: Mutex<Option<StreamSubscription>>,
    disposed: AtomicBool,
}

impl FeedSession {
    fn start(
        feed: &RealtimeFeed,
        state: Arc<watch::Sender<FeedState>>,
        symbol: Symbol,
        timeframe: Timeframe,
        range: Option<DateRange>,
    ) -> Arc<Self> {
        let timers = TimerSet::new();
        let polling = PollingFallback::new(
            Arc::clone(&feed.source),
            symbol.clone(),
            feed.config.ticker_poll_interval,
            timers.clone(),
        );

        let session = Arc::new(Self {
            topic: Topic::ticker(symbol.clone()),
            timeframe,
            range,
            feed: feed.clone(),
            timers,
            polling,
            state,
            stream: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        session.state.send_replace(FeedState::loading(symbol, timeframe));
        session.spawn_history_refresh();
        session.start_polling();
        session.subscribe_stream();
        session.spawn_health_monitor();

        tracing::info!(topic = %session.topic, %timeframe, "Feed started");
        session
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Apply `f` unless disposed; observers are notified when it returns true.
    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut FeedState) -> bool,
    {
        self.state
            .send_if_modified(|state| !self.is_disposed() && f(state))
    }

    // ── History ──────────────────────────────────────────────────────────

    fn spawn_history_refresh(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.feed.config.history_refresh_interval(self.timeframe);

        self.timers.spawn(TimerKind::HistoryRefresh, async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };
                session.load_history().await;
            }
        });
    }

    /// Candles plus a ticker snapshot, fetched concurrently.
    async fn load_history(&self) {
        let source = self.feed.source.as_ref();
        let symbol = self.topic.symbol();
        let today = Utc::now().date_naive();

        let (candles, ticker) = tokio::join!(
            candle::load_history(source, symbol, self.timeframe, self.range.as_ref(), today),
            source.get_ticker_snapshot(symbol),
        );

        let mut error = None;
        if let Err(e) = &candles {
            tracing::warn!(topic = %self.topic, "Candle history fetch failed: {}", e);
            error = Some(format!("Failed to load candles: {e}"));
        }
        if let Err(e) = &ticker {
            tracing::warn!(topic = %self.topic, "Ticker snapshot fetch failed: {}", e);
            if error.is_none() {
                error = Some(format!("Failed to load ticker: {e}"));
            }
        }

        self.update(|state| {
            if let Ok(series) = candles {
                state.candles = series;
            }
            // The stream owns the ticker while connected.
            if let Ok(snapshot) = ticker {
                if !state.is_connected {
                    state.apply_ticker(snapshot, Source::Poll);
                }
            }
            state.error = error;
            state.loading = false;
            true
        });
    }

    fn refetch(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        self.update(|state| {
            state.loading = true;
            true
        });

        let weak = Arc::downgrade(self);
        self.timers.spawn(TimerKind::Refetch, async move {
            if let Some(session) = weak.upgrade() {
                session.load_history().await;
            }
        });
    }

    // ── Ticker writers ───────────────────────────────────────────────────

    fn start_polling(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        let weak = Arc::downgrade(self);
        self.polling.start(move |result| {
            if let Some(session) = weak.upgrade() {
                session.on_poll(result);
            }
        });
    }

    fn on_poll(&self, result: Result<TickerSnapshot, HttpError>) {
        match result {
            Ok(snapshot) => self.update(|state| {
                state.apply_ticker(snapshot, Source::Poll);
                state.is_connected = false;
                state.error = None;
                true
            }),
            Err(e) => {
                let message = format!("Failed to fetch ticker: {e}");
                self.update(|state| {
                    state.error = Some(message);
                    true
                })
            }
        };
    }

    fn subscribe_stream(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscribed = self.feed.registry.subscribe(self.topic.clone(), move |snapshot| {
            if let Some(session) = weak.upgrade() {
                session.on_stream(snapshot);
            }
        });

        match subscribed {
            Ok(subscription) => {
                let previous = self.stream.lock().replace(subscription);
                drop(previous);
            }
            Err(e) => tracing::debug!(topic = %self.topic, "Stream not attempted: {}", e),
        }
    }

    /// The stream is delivering: it becomes the only writer.
    fn on_stream(&self, snapshot: TickerSnapshot) {
        if self.is_disposed() {
            return;
        }
        self.polling.stop();
        self.update(|state| {
            state.apply_ticker(snapshot, Source::Stream);
            state.is_connected = true;
            state.error = None;
            true
        });
    }

    // ── Health ───────────────────────────────────────────────────────────

    fn spawn_health_monitor(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.feed.config.health_check_interval;

        self.timers.spawn(TimerKind::HealthMonitor, async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };
                session.check_health();
            }
        });
    }

    /// Lowers `is_connected` when the stream left `Open`; never raises it.
    fn check_health(self: &Arc<Self>) {
        let status = self.feed.registry.status(&self.topic);
        let mut lost = false;

        self.update(|state| {
            let mut changed = false;
            if state.is_connected && !status.is_open_and_not_fallback {
                state.is_connected = false;
                lost = true;
                changed = true;
            }
            if state.connection_attempts != status.attempts {
                state.connection_attempts = status.attempts;
                changed = true;
            }
            changed
        });

        if lost {
            tracing::warn!(topic = %self.topic, "Stream no longer open, resuming polling");
        }
        // A pending retry delay restarts polling itself.
        if !status.is_open_and_not_fallback
            && !self.polling.is_running()
            && !self.timers.is_active(TimerKind::RetryDelay)
        {
            self.start_polling();
        }
    }

    // ── Recovery / teardown ──────────────────────────────────────────────

    fn retry_connection(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        tracing::info!(topic = %self.topic, "Manual stream retry requested");

        self.feed.registry.reset_fallback_mode();
        self.polling.stop();

        let previous = self.stream.lock().take();
        drop(previous);
        self.subscribe_stream();

        let weak = Arc::downgrade(self);
        let delay = self.feed.config.retry_delay;
        self.timers.spawn(TimerKind::RetryDelay, async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = weak.upgrade() {
                session.start_polling();
            }
        });
    }

    /// Returns false when already disposed.
    fn dispose(&self) -> bool {
        // Flip the flag under the channel lock so no write lands after it.
        let mut first = false;
        self.state.send_if_modified(|_| {
            first = !self.disposed.swap(true, Ordering::SeqCst);
            false
        });
        if !first {
            return false;
        }

        let stream = self.stream.lock().take();
        drop(stream);
        self.timers.cancel_all();

        tracing::info!(topic = %self.topic, "Feed disposed");
        true
    }
}

// ─── Public handle ───────────────────────────────────────────────────────────

/// Live feed for one target. Dropping the handle disposes it.
pub struct FeedHandle {
    feed: RealtimeFeed,
    state: Arc<watch::Sender<FeedState>>,
    session: Mutex<Arc<FeedSession>>,
}

impl FeedHandle {
    pub(crate) fn start(
        feed: RealtimeFeed,
        symbol: Symbol,
        timeframe: Timeframe,
        range: Option<DateRange>,
    ) -> Self {
        let (tx, _) = watch::channel(FeedState::loading(symbol.clone(), timeframe));
        let state = Arc::new(tx);
        let session = FeedSession::start(&feed, Arc::clone(&state), symbol, timeframe, range);

        Self {
            feed,
            state,
            session: Mutex::new(session),
        }
    }

    fn session(&self) -> Arc<FeedSession> {
        Arc::clone(&self.session.lock())
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change, across `retarget`.
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn topic(&self) -> Topic {
        self.session().topic.clone()
    }

    /// Re-fetch candles and the ticker snapshot. Leaves stream and polling alone.
    pub fn refetch(&self) {
        self.session().refetch();
    }

    /// Reset the circuit breaker, re-attempt the stream, and restart polling
    /// after the configured delay. Does not guarantee the stream reconnects.
    pub fn retry_connection(&self) {
        self.session().retry_connection();
    }

    /// Cancel every timer and release the stream. Idempotent.
    pub fn dispose(&self) {
        self.session().dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.session().is_disposed()
    }

    /// Switch to a new target: the current one is torn down first.
    pub fn retarget(&self, symbol: Symbol, timeframe: Timeframe, range: Option<DateRange>) {
        let mut session = self.session.lock();
        session.dispose();
        *session = FeedSession::start(
            &self.feed,
            Arc::clone(&self.state),
            symbol.or_default(),
            timeframe,
            range,
        );
    }

    /// Timers still scheduled for the current target.
    pub fn pending_timers(&self) -> usize {
        self.session().timers.pending()
    }

    pub fn is_polling(&self) -> bool {
        self.session().polling.is_running()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.session.get_mut().dispose();
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session();
        f.debug_struct("FeedHandle")
            .field("topic", &session.topic)
            .field("timeframe", &session.timeframe)
            .field("disposed", &session.is_disposed())
            .finish()
    }
}
