//! `QuattroServer`: axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::session::SessionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::ws_handler;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
    /// Open WebSocket connections.
    pub connections: Arc<AtomicUsize>,
    pub start_time: Instant,
}

pub struct QuattroServer {
    config: Arc<ServerConfig>,
    registry: Arc<SessionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    connections: Arc<AtomicUsize>,
    start_time: Instant,
}

impl QuattroServer {
    pub fn new(config: ServerConfig) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new(config.shutdown_timeout()));
        Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            shutdown,
            connections: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.token(),
            connections: self.connections.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });
        info!(%addr, "listening");
        Ok((addr, handle))
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.connections.load(Ordering::Relaxed),
        state.registry.session_count(),
        state.registry.join_count(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_server() -> QuattroServer {
        QuattroServer::new(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server();
        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 0);
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn health_counts_sessions() {
        let server = make_server();
        let (_, join, _) = server.registry().create_session();
        let _ = server.registry().create_session();
        server.registry().release_join(&join);

        let (_, body) = get_json(server.router(), "/health").await;
        assert_eq!(body["active_sessions"], 2);
        assert_eq!(body["joinable_sessions"], 1);
    }

    #[tokio::test]
    async fn plain_get_on_ws_route_is_rejected() {
        let server = make_server();
        for uri in ["/", "/ws"] {
            let (status, _) = get_json(server.router(), uri).await;
            assert!(status.is_client_error(), "{uri} answered {status}");
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let (status, _) = get_json(server.router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.connection_count(), 0);

        server.shutdown().graceful_shutdown(vec![handle]).await;
        assert!(server.shutdown().is_shutting_down());
    }
}
