//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{future, SinkExt, StreamExt};
use quattro_core::{ConnectionId, ProtocolError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::connection::ClientConnection;
use crate::protocol::{self, ConnectionOutcome};
use crate::server::AppState;

/// How long the writer gets to flush queued events after the handler ends.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Run a WebSocket session for a connected client.
///
/// 1. Spawns the outbound writer, which also sends periodic Ping frames and
///    gives up on clients silent for longer than the heartbeat timeout
/// 2. Feeds text and binary frames to the protocol handler. Binary frames
///    must hold UTF-8 text, anything else is a protocol violation
/// 3. Stops early when the server shuts down
/// 4. Closes the connection and lets the writer flush
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(ws: WebSocket, state: AppState, conn_id: ConnectionId) {
    let (mut ws_tx, ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(state.config.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(conn_id, send_tx));

    let active = state.connections.fetch_add(1, Ordering::Relaxed) + 1;
    info!(active, "client connected");

    let outbound_conn = connection.clone();
    let ping_every = state.config.heartbeat_interval();
    let pong_timeout = state.config.heartbeat_timeout();
    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive() && outbound_conn.last_pong_elapsed() > pong_timeout {
                        warn!(timeout = ?pong_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                () = outbound_conn.closed() => {
                    // Deliver whatever was queued before the close, e.g. a final error.
                    while let Ok(text) = send_rx.try_recv() {
                        if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                            break;
                        }
                    }
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        outbound_conn.close();
    });

    let inbound_conn = connection.clone();
    let incoming = ws_rx
        .take_while(|frame| future::ready(matches!(frame, Ok(msg) if !matches!(msg, Message::Close(_)))))
        .filter_map(move |frame| {
            inbound_conn.mark_alive();
            let inbound = match frame {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                    Ok(s) => Some(Ok(s.to_owned())),
                    Err(_) => {
                        debug!(len = data.len(), "binary frame is not UTF-8");
                        Some(Err(ProtocolError::InvalidUtf8))
                    }
                },
                _ => None,
            };
            future::ready(inbound)
        });
    let incoming = std::pin::pin!(incoming);

    let outcome = tokio::select! {
        outcome = protocol::handle_connection(incoming, connection.clone(), state.registry.clone()) => Some(outcome),
        () = state.shutdown.cancelled() => None,
    };

    connection.close();
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut outbound).await.is_err() {
        outbound.abort();
    }

    let active = state.connections.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
    let duration_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX);
    match outcome {
        Some(ConnectionOutcome::Closed) => {
            info!(active, duration_ms, dropped = connection.drop_count(), "client disconnected");
        }
        Some(ConnectionOutcome::ProtocolViolation(err)) => {
            info!(active, duration_ms, kind = err.error_kind(), "client dropped for protocol violation");
        }
        None => info!(active, duration_ms, "client disconnected by server shutdown"),
    }
}
