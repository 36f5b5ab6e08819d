//! Event fan-out to the connections attached to one game.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use quattro_core::{ConnectionId, Move, ServerEvent};
use tracing::{debug, warn};

use crate::connection::ClientConnection;

/// The set of connections receiving a game's events.
#[derive(Default)]
pub struct BroadcastGroup {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl BroadcastGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Subscribing twice is a no-op.
    pub fn subscribe(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write();
        let _ = conns.entry(connection.id.clone()).or_insert(connection);
    }

    /// Remove a connection. Removing an absent id is a no-op.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) {
        let _ = self.connections.write().remove(connection_id);
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.read().contains_key(connection_id)
    }

    /// Send an event to every subscriber.
    ///
    /// The event is serialized once. Connections that cannot take the
    /// message are evicted and told to close; the rest still receive it.
    pub fn broadcast(&self, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event_type = event.event_type(), error = %e, "failed to serialize event");
                return;
            }
        };

        let snapshot: Vec<Arc<ClientConnection>> =
            self.connections.read().values().cloned().collect();
        debug!(
            event_type = event.event_type(),
            recipients = snapshot.len(),
            "broadcast event"
        );

        let mut failed = Vec::new();
        for conn in &snapshot {
            if !conn.send(json.clone()) {
                failed.push(conn);
            }
        }

        if failed.is_empty() {
            return;
        }
        let mut conns = self.connections.write();
        for conn in failed {
            warn!(
                conn_id = %conn.id,
                dropped = conn.drop_count(),
                "evicting subscriber that cannot keep up"
            );
            let _ = conns.remove(&conn.id);
            conn.close();
        }
    }

    /// Send a move log to a single connection as `play` events, in order.
    pub fn replay(&self, connection: &ClientConnection, moves: &[Move]) {
        for mv in moves {
            if !connection.send_event(&ServerEvent::from(*mv)) {
                warn!(conn_id = %connection.id, total = moves.len(), "replay interrupted");
                connection.close();
                return;
            }
        }
        debug!(conn_id = %connection.id, moves = moves.len(), "replayed history");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quattro_core::{PLAYER1, PLAYER2};
    use tokio::sync::mpsc;

    fn make_connection(capacity: usize) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(ClientConnection::new(ConnectionId::new(), tx)), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<String>>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(serde_json::from_str(&msg).unwrap());
        }
        out
    }

    #[test]
    fn subscribe_is_idempotent() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_connection(8);
        group.subscribe(conn.clone());
        group.subscribe(conn.clone());
        assert_eq!(group.len(), 1);
        assert!(group.contains(&conn.id));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_connection(8);
        group.subscribe(conn.clone());
        group.unsubscribe(&conn.id);
        group.unsubscribe(&conn.id);
        assert!(group.is_empty());
    }

    #[test]
    fn broadcast_reaches_every_subscriber() {
        let group = BroadcastGroup::new();
        let (a, mut rx_a) = make_connection(8);
        let (b, mut rx_b) = make_connection(8);
        group.subscribe(a);
        group.subscribe(b);

        group.broadcast(&ServerEvent::Win { player: PLAYER2 });

        for rx in [&mut rx_a, &mut rx_b] {
            let events = drain(rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0]["type"], "win");
            assert_eq!(events[0]["player"], "yellow");
        }
    }

    #[test]
    fn broadcast_to_empty_group_is_noop() {
        let group = BroadcastGroup::new();
        group.broadcast(&ServerEvent::Win { player: PLAYER1 });
        assert!(group.is_empty());
    }

    #[test]
    fn full_subscriber_is_evicted_without_affecting_others() {
        let group = BroadcastGroup::new();
        let (slow, _slow_rx) = make_connection(1);
        let (fast, mut fast_rx) = make_connection(8);
        group.subscribe(slow.clone());
        group.subscribe(fast.clone());

        let mv = Move { player: PLAYER1, column: 3, row: 0 };
        group.broadcast(&ServerEvent::from(mv));
        group.broadcast(&ServerEvent::from(mv));

        assert!(!group.contains(&slow.id));
        assert!(slow.is_closed());
        assert!(group.contains(&fast.id));
        assert_eq!(drain(&mut fast_rx).len(), 2);
    }

    #[test]
    fn disconnected_subscriber_is_evicted() {
        let group = BroadcastGroup::new();
        let (gone, rx) = make_connection(8);
        drop(rx);
        group.subscribe(gone.clone());
        group.broadcast(&ServerEvent::Win { player: PLAYER1 });
        assert!(group.is_empty());
    }

    #[test]
    fn replay_sends_moves_in_order() {
        let group = BroadcastGroup::new();
        let (conn, mut rx) = make_connection(8);
        let moves = [
            Move { player: PLAYER1, column: 3, row: 0 },
            Move { player: PLAYER2, column: 3, row: 1 },
        ];
        group.replay(&conn, &moves);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                serde_json::json!({"type": "play", "player": "red", "column": 3, "row": 0}),
                serde_json::json!({"type": "play", "player": "yellow", "column": 3, "row": 1}),
            ]
        );
    }

    #[test]
    fn replay_that_overflows_closes_connection() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_connection(1);
        let moves = [
            Move { player: PLAYER1, column: 0, row: 0 },
            Move { player: PLAYER2, column: 1, row: 0 },
        ];
        group.replay(&conn, &moves);
        assert!(conn.is_closed());
    }
}
