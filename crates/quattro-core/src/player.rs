use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two sides. `Red` always moves first.
///
/// On the wire players are the lowercase colour names the browser client
/// uses as CSS classes.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Red,
    Yellow,
}

/// The hosting player.
pub const PLAYER1: Player = Player::Red;
/// The player who joins with the join token.
pub const PLAYER2: Player = Player::Yellow;

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
