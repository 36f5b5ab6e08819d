//! Server-side error types.

use thiserror::Error;

/// Lookup failures when a connection asks for an existing game.
///
/// Recoverable: the client is told and may send another `init`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Game not found.")]
    TokenNotFound,
    #[error("Game is full.")]
    SeatTaken,
}

impl SessionError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::TokenNotFound => "token_not_found",
            Self::SeatTaken => "seat_taken",
        }
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_are_client_facing() {
        assert_eq!(SessionError::TokenNotFound.to_string(), "Game not found.");
        assert_eq!(SessionError::SeatTaken.to_string(), "Game is full.");
        assert_eq!(SessionError::TokenNotFound.error_kind(), "token_not_found");
    }

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err = ConfigError::Json(json_err);
        assert!(err.to_string().contains("parse config JSON"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn invalid_value_display() {
        let err = ConfigError::InvalidValue("port out of range".to_string());
        assert_eq!(err.to_string(), "invalid config value: port out of range");
    }
}
