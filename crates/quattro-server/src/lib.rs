//! # quattro-server
//!
//! Live four-in-a-row games over WebSocket. A host opens a game and gets two
//! tokens: one lets a second player join, the other lets anyone watch.
//!
//! - [`session`]: the token registry, live sessions and their broadcast groups
//! - [`protocol`]: the per-connection role state machine
//! - [`websocket`]: the axum transport adapter with heartbeats
//! - [`server`]: router, health endpoint and lifecycle

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod health;
pub mod protocol;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod websocket;

pub use config::{load_config, ServerConfig};
pub use errors::{ConfigError, SessionError};
pub use server::{AppState, QuattroServer};
pub use session::{Session, SessionRegistry, Token};
