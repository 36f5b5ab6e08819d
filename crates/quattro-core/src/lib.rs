//! # quattro-core
//!
//! Shared building blocks for the quattro game server: the four-in-a-row
//! engine, player and move types, the JSON wire events, and error types.
//! Nothing here performs I/O.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod game;
pub mod ids;
pub mod player;

pub use errors::{GameError, ProtocolError};
pub use events::{ClientMessage, Intent, ServerEvent};
pub use game::{Game, Move, COLUMNS, ROWS};
pub use ids::{ConnectionId, SessionId};
pub use player::{Player, PLAYER1, PLAYER2};
