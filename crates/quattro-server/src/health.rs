//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: &'static str,
    pub uptime_secs: u64,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Games still reachable through a join or watch token.
    pub active_sessions: usize,
    /// Games still waiting for, or open to, a second player.
    pub joinable_sessions: usize,
}

pub fn health_check(
    start_time: Instant,
    connections: usize,
    active_sessions: usize,
    joinable_sessions: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        active_sessions,
        joinable_sessions,
    }
}
