//! Per-client connection state shared between the socket tasks, the
//! protocol handler and any broadcast group the client belongs to.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quattro_core::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A connected client.
///
/// Outbound messages go through a bounded queue drained by the socket
/// writer. Enqueueing never blocks: when the queue is full the message is
/// dropped and counted.
pub struct ClientConnection {
    pub id: ConnectionId,
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    /// Whether the client has shown activity since the last heartbeat check.
    pub is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    pub dropped_messages: AtomicU64,
    closed: CancellationToken,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Enqueue an already-serialized message.
    ///
    /// Returns `false` if the connection is closed or its queue is full.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize and enqueue a single event.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(conn_id = %self.id, event_type = event.event_type(), error = %e, "failed to serialize event");
                false
            }
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Ask the socket tasks to wind down. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Record inbound activity (pong or any frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the client connected.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("dropped_messages", &self.drop_count())
            .finish_non_exhaustive()
    }
}
