/// Game-rule failures reported by [`crate::Game::play`].
///
/// The `Display` text is what the offending client sees in its `error` event.
/// All of these are recoverable: the connection and the game carry on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("It isn't your turn.")]
    OutOfTurn,
    #[error("This slot is full.")]
    ColumnFull,
    #[error("Column {0} is out of range.")]
    InvalidColumn(i64),
    #[error("The game is over.")]
    GameOver,
    #[error("move {index} does not match the replayed board")]
    ReplayDiverged { index: usize },
}

impl GameError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::OutOfTurn => "out_of_turn",
            Self::ColumnFull => "column_full",
            Self::InvalidColumn(_) => "invalid_column",
            Self::GameOver => "game_over",
            Self::ReplayDiverged { .. } => "replay_diverged",
        }
    }
}

/// A client broke the message contract. Fatal to the connection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("expected {expected} event, got {got}")]
    Unexpected {
        expected: &'static str,
        got: &'static str,
    },
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::Unexpected { .. } => "unexpected",
            Self::InvalidUtf8 => "invalid_utf8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_error_messages_are_client_facing() {
        assert_eq!(GameError::OutOfTurn.to_string(), "It isn't your turn.");
        assert_eq!(GameError::ColumnFull.to_string(), "This slot is full.");
        assert_eq!(GameError::InvalidColumn(9).to_string(), "Column 9 is out of range.");
        assert_eq!(GameError::GameOver.to_string(), "The game is over.");
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(GameError::OutOfTurn.error_kind(), "out_of_turn");
        assert_eq!(GameError::InvalidColumn(-1).error_kind(), "invalid_column");
        assert_eq!(
            ProtocolError::Unexpected { expected: "init", got: "play" }.error_kind(),
            "unexpected"
        );
        assert_eq!(ProtocolError::InvalidUtf8.error_kind(), "invalid_utf8");
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::Unexpected { expected: "init", got: "play" };
        assert_eq!(err.to_string(), "expected init event, got play");
    }
}
