//! WebSocket transport for game connections.

pub mod session;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use quattro_core::ConnectionId;

use crate::server::AppState;

pub use session::run_ws_session;

/// GET / and GET /ws: upgrade to a game connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let conn_id = ConnectionId::new();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, state, conn_id))
}
