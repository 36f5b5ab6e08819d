//! Wire messages. Every message is a JSON object whose `type` field selects
//! the variant.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::game::Move;
use crate::player::Player;

/// Messages a client sends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on a connection. Neither token means "start a new game".
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        watch: Option<String>,
    },
    Play {
        column: i64,
    },
}

/// The role a connection asks for, decided once from its `init` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Start,
    Join(String),
    Watch(String),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Play { .. } => "play",
        }
    }

    /// Classify an `init` message. A join token takes precedence over a
    /// watch token when both are present.
    pub fn into_intent(self) -> Result<Intent, ProtocolError> {
        match self {
            Self::Init { join: Some(token), .. } => Ok(Intent::Join(token)),
            Self::Init { watch: Some(token), .. } => Ok(Intent::Watch(token)),
            Self::Init { .. } => Ok(Intent::Start),
            other => Err(ProtocolError::Unexpected {
                expected: "init",
                got: other.event_type(),
            }),
        }
    }
}

/// Messages the server sends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent to the host only, right after the game is created.
    Init { join: String, watch: String },
    Play {
        player: Player,
        column: usize,
        row: usize,
    },
    /// Terminal. Always follows the `play` that completed the line.
    Win { player: Player },
    /// Unicast to the connection whose request failed.
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Play { .. } => "play",
            Self::Win { .. } => "win",
            Self::Error { .. } => "error",
        }
    }
}

impl From<Move> for ServerEvent {
    fn from(mv: Move) -> Self {
        Self::Play {
            player: mv.player,
            column: mv.column,
            row: mv.row,
        }
    }
}
