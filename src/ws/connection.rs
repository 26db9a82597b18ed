//! `StreamConnection`: one socket for one topic.
//!
//! A background tokio task owns the socket and walks the
//! `Idle → Connecting → Open → {Closing → Idle | Failed}` lifecycle:
//! - Connect attempts bounded by `WsConfig::connect_timeout`
//! - Bounded exponential backoff on transport failure
//! - Process-wide circuit breaker once the retries run out
//! - Fan-out of decoded ticker snapshots to every listener
//!
//! The owning handle communicates with the task through a `watch` shutdown
//! signal; dropping the handle is equivalent to `close()`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::ticker::TickerSnapshot;
use crate::error::WsError;
use crate::shared::Topic;
use crate::ws::transport::{Frame, Socket, Transport};
use crate::ws::{is_normal_close, ConnectionState, Kind, WsConfig};

/// Callback receiving every decoded ticker snapshot.
pub type TickerHandler = Arc<dyn Fn(TickerSnapshot) + Send + Sync>;

// ─── Shared state ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Status {
    state: ConnectionState,
    attempts: u32,
}

struct Shared {
    topic: Topic,
    status: Mutex<Status>,
    listeners: Mutex<HashMap<u64, TickerHandler>>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.status.lock().state = state;
    }

    fn on_open(&self) {
        let mut status = self.status.lock();
        status.state = ConnectionState::Open;
        status.attempts = 0;
    }

    fn dispatch_text(&self, text: &str) {
        let snapshot = match Kind::parse(text) {
            Ok(kind) => match kind.into_snapshot() {
                Some(snapshot) => snapshot,
                None => {
                    tracing::debug!(topic = %self.topic, "Ignoring non-ticker stream event");
                    return;
                }
            },
            Err(e) => {
                tracing::warn!(topic = %self.topic, "Dropping malformed stream payload: {}", e);
                return;
            }
        };

        // Clone handlers out so none runs under the lock.
        let handlers: Vec<TickerHandler> = self.listeners.lock().values().cloned().collect();
        for handler in handlers {
            handler(snapshot.clone());
        }
    }
}

// ─── Public handle ───────────────────────────────────────────────────────────

/// Handle to one topic's socket task.
pub struct StreamConnection {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StreamConnection {
    /// Spawn the connection task. Transitions to `Connecting` immediately.
    ///
    /// Must be called within a Tokio runtime.
    pub fn open(
        topic: Topic,
        config: WsConfig,
        transport: Arc<dyn Transport>,
        fallback_mode: Arc<AtomicBool>,
    ) -> Self {
        let shared = Arc::new(Shared {
            topic,
            status: Mutex::new(Status {
                state: ConnectionState::Connecting,
                attempts: 0,
            }),
            listeners: Mutex::new(HashMap::new()),
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_task(
            TaskContext {
                shared: Arc::clone(&shared),
                config,
                transport,
                fallback_mode,
            },
            shutdown_rx,
        ));

        Self {
            shared,
            shutdown,
            task,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.shared.topic
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.status.lock().state
    }

    /// Reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.shared.status.lock().attempts
    }

    /// Whether the background task has ended (normal close, breaker, or `close()`).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn add_listener(&self, id: u64, handler: TickerHandler) {
        self.shared.listeners.lock().insert(id, handler);
    }

    /// Remove a listener. Returns the number still attached.
    pub fn remove_listener(&self, id: u64) -> usize {
        let mut listeners = self.shared.listeners.lock();
        listeners.remove(&id);
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Close with normal-closure code, whatever state the connection is in.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

struct TaskContext {
    shared: Arc<Shared>,
    config: WsConfig,
    transport: Arc<dyn Transport>,
    fallback_mode: Arc<AtomicBool>,
}

impl TaskContext {
    /// Next backoff delay, or `None` when this topic must stop retrying.
    fn schedule_retry(&self) -> Option<Duration> {
        if self.fallback_mode.load(Ordering::SeqCst) {
            return None;
        }

        let policy = &self.config.reconnect;
        let mut status = self.shared.status.lock();
        if status.attempts < policy.max_attempts {
            status.attempts += 1;
            return Some(policy.delay_for_attempt(status.attempts));
        }

        status.attempts = 0;
        drop(status);
        self.fallback_mode.store(true, Ordering::SeqCst);
        tracing::warn!(
            topic = %self.shared.topic,
            max = policy.max_attempts,
            "Reconnect attempts exhausted, entering fallback mode"
        );
        None
    }
}

enum Disconnect {
    Shutdown,
    NormalClose,
    Failed(WsError),
}

async fn run_task(ctx: TaskContext, mut shutdown: watch::Receiver<bool>) {
    let url = ctx.config.stream_url(&ctx.shared.topic);
    let timeout_ms = ctx.config.connect_timeout.as_millis() as u64;

    loop {
        // The breaker may have tripped on another topic while we slept.
        if ctx.fallback_mode.load(Ordering::SeqCst) {
            tracing::debug!(topic = %ctx.shared.topic, "Fallback mode active, not connecting");
            break;
        }

        // ── 1. Attempt connection ────────────────────────────────────────
        ctx.shared.set_state(ConnectionState::Connecting);
        let connect = tokio::time::timeout(ctx.config.connect_timeout, ctx.transport.connect(&url));
        let outcome = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            outcome = connect => outcome,
        };

        let error = match outcome {
            Ok(Ok(socket)) => {
                // ── 2. Connected ─────────────────────────────────────────
                ctx.shared.on_open();
                tracing::info!(topic = %ctx.shared.topic, "Stream connected");

                match run_connected(&ctx, socket, &mut shutdown).await {
                    Disconnect::Shutdown | Disconnect::NormalClose => break,
                    Disconnect::Failed(e) => e,
                }
            }
            Ok(Err(e)) => e,
            Err(_) => WsError::ConnectTimeout(timeout_ms),
        };

        // ── 3. Failure → reconnect policy ────────────────────────────────
        ctx.shared.set_state(ConnectionState::Failed);
        tracing::warn!(topic = %ctx.shared.topic, "Stream failure: {}", error);

        let Some(delay) = ctx.schedule_retry() else {
            break;
        };
        tracing::info!(
            topic = %ctx.shared.topic,
            attempt = ctx.shared.status.lock().attempts,
            max = ctx.config.reconnect.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling stream reconnect"
        );

        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    ctx.shared.set_state(ConnectionState::Idle);
}

/// Runs until the connection ends.
async fn run_connected(
    ctx: &TaskContext,
    mut socket: Box<dyn Socket>,
    shutdown: &mut watch::Receiver<bool>,
) -> Disconnect {
    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => {
                ctx.shared.set_state(ConnectionState::Closing);
                if let Err(e) = socket.send(Frame::close_normal("Client disconnect")).await {
                    tracing::debug!(topic = %ctx.shared.topic, "Close frame not sent: {}", e);
                }
                return Disconnect::Shutdown;
            }
            frame = socket.recv() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    // A breaker tripped on any topic ends streaming everywhere.
                    if ctx.fallback_mode.load(Ordering::SeqCst) {
                        tracing::info!(topic = %ctx.shared.topic, "Fallback mode active, closing stream");
                        ctx.shared.set_state(ConnectionState::Closing);
                        if let Err(e) = socket.send(Frame::close_normal("Fallback mode")).await {
                            tracing::debug!(topic = %ctx.shared.topic, "Close frame not sent: {}", e);
                        }
                        return Disconnect::Shutdown;
                    }
                    ctx.shared.dispatch_text(&text);
                }
                Some(Ok(Frame::Ping(data))) => {
                    let _ = socket.send(Frame::Pong(data)).await;
                }
                Some(Ok(Frame::Close { code, reason })) => {
                    if is_normal_close(code) {
                        tracing::info!(topic = %ctx.shared.topic, ?code, "Stream closed normally");
                        return Disconnect::NormalClose;
                    }
                    return Disconnect::Failed(WsError::Closed { code, reason });
                }
                Some(Ok(_)) => {} // Binary, Pong
                Some(Err(e)) => return Disconnect::Failed(e),
                None => {
                    return Disconnect::Failed(WsError::Closed {
                        code: None,
                        reason: "Stream ended".into(),
                    })
                }
            }
        }
    }
}

/// Resolves once shutdown is requested or the handle is dropped.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
