//! `ConnectionRegistry`: topic → `StreamConnection` map plus the breaker.
//!
//! Each topic has at most one live connection. Later subscribers to the same
//! topic attach as listeners; the socket closes when the last one leaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::domain::ticker::TickerSnapshot;
use crate::error::WsError;
use crate::shared::Topic;
use crate::ws::connection::{StreamConnection, TickerHandler};
use crate::ws::transport::Transport;
use crate::ws::{ConnectionState, ConnectionStatus, WsConfig};

struct Entry {
    id: u64,
    connection: StreamConnection,
}

struct RegistryInner {
    config: WsConfig,
    transport: Arc<dyn Transport>,
    /// Process-wide circuit breaker shared with every connection task.
    fallback_mode: Arc<AtomicBool>,
    connections: Mutex<HashMap<Topic, Entry>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn remove_listener(&self, topic: &Topic, connection_id: u64, listener_id: u64) {
        let closed = {
            let mut connections = self.connections.lock();
            match connections.get(topic) {
                // A replaced connection already released its listeners.
                Some(entry) if entry.id == connection_id => {
                    if entry.connection.remove_listener(listener_id) == 0 {
                        connections.remove(topic)
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };

        if let Some(entry) = closed {
            tracing::info!(%topic, "Last listener left, closing stream");
            entry.connection.close();
        }
    }
}

/// Shared table of stream connections.
///
/// Cheap to clone; every clone refers to the same map and breaker.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new(config: WsConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                transport,
                fallback_mode: Arc::new(AtomicBool::new(false)),
                connections: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    /// Register interest in `topic`.
    ///
    /// Reuses the topic's connection while its task is alive; otherwise the
    /// stale entry is torn down and a fresh connection opened. Fails with
    /// `WsError::FallbackMode` while the breaker is tripped.
    ///
    /// Must be called within a Tokio runtime.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Result<StreamSubscription, WsError>
    where
        F: Fn(TickerSnapshot) + Send + Sync + 'static,
    {
        if self.is_fallback_mode() {
            return Err(WsError::FallbackMode);
        }

        let handler: TickerHandler = Arc::new(handler);
        let listener_id = self.inner.next_id();

        let mut connections = self.inner.connections.lock();
        let connection_id = match connections.get(&topic) {
            Some(entry) if !entry.connection.is_finished() => {
                entry.connection.add_listener(listener_id, handler);
                tracing::debug!(
                    %topic,
                    listeners = entry.connection.listener_count(),
                    "Attached to existing stream"
                );
                entry.id
            }
            _ => {
                if let Some(stale) = connections.remove(&topic) {
                    stale.connection.close();
                }
                let id = self.inner.next_id();
                let connection = StreamConnection::open(
                    topic.clone(),
                    self.inner.config.clone(),
                    Arc::clone(&self.inner.transport),
                    Arc::clone(&self.inner.fallback_mode),
                );
                connection.add_listener(listener_id, handler);
                connections.insert(topic.clone(), Entry { id, connection });
                tracing::info!(%topic, "Opening stream");
                id
            }
        };

        Ok(StreamSubscription {
            registry: Arc::downgrade(&self.inner),
            topic,
            connection_id,
            listener_id,
            active: true,
        })
    }

    /// Status snapshot for health monitoring. Never blocks on I/O.
    pub fn status(&self, topic: &Topic) -> ConnectionStatus {
        let fallback = self.is_fallback_mode();
        let connections = self.inner.connections.lock();
        match connections.get(topic) {
            Some(entry) => ConnectionStatus {
                is_open_and_not_fallback: !fallback
                    && entry.connection.state() == ConnectionState::Open,
                attempts: entry.connection.attempts(),
            },
            None => ConnectionStatus::default(),
        }
    }

    pub fn is_fallback_mode(&self) -> bool {
        self.inner.fallback_mode.load(Ordering::SeqCst)
    }

    /// Clear the breaker so future `subscribe` calls may stream again.
    pub fn reset_fallback_mode(&self) {
        if self.inner.fallback_mode.swap(false, Ordering::SeqCst) {
            tracing::info!("Fallback mode reset");
        }
    }

    /// Number of topics with a registered connection.
    pub fn live_connections(&self) -> usize {
        self.inner.connections.lock().len()
    }

    /// Close every connection and forget every topic. Resets the breaker.
    pub fn cleanup(&self) {
        let drained: Vec<Entry> = self
            .inner
            .connections
            .lock()
            .drain()
            .map(|(_, entry)| entry)
            .collect();

        for entry in &drained {
            entry.connection.close();
        }
        self.inner.fallback_mode.store(false, Ordering::SeqCst);
        tracing::info!(closed = drained.len(), "Connection registry cleaned up");
    }
}

/// One listener's interest in a topic. Released on `unsubscribe` or drop.
pub struct StreamSubscription {
    registry: Weak<RegistryInner>,
    topic: Topic,
    connection_id: u64,
    listener_id: u64,
    active: bool,
}

impl StreamSubscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Detach this listener. Idempotent.
    pub fn unsubscribe(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(&self.topic, self.connection_id, self.listener_id);
        }
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for StreamSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSubscription")
            .field("topic", &self.topic)
            .field("active", &self.active)
            .finish()
    }
}
