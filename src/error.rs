//! The error taxonomy, per spec §7.
//!
//! This is the off-chain analogue of the teacher's `#[error_code] enum
//! HiddenHandError`: one flat enum, one human-readable message per variant,
//! used both as the `action_error` reason string sent to clients and as the
//! body of HTTP error responses.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Bad/missing/expired token at the websocket handshake.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Turn/stage/amount precondition violation. Hand state is unchanged.
    #[error("{0}")]
    InvalidAction(String),

    /// Should-never-happen condition (e.g. dealing onto non-empty hole cards).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Action deadline passed; resolved internally, surfaced informationally.
    #[error("action timed out: {0}")]
    Timeout(String),

    /// Socket read/write failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Directory/Agent adapter call failed.
    #[error("external service error: {0}")]
    External(String),

    /// Unknown game/player for an administrative endpoint.
    #[error("not found: {0}")]
    NotFound(String),

    /// Seat taken, table full, already seated.
    #[error("{0}")]
    Capacity(String),
}

impl GameError {
    pub fn invalid_action(msg: impl Into<String>) -> Self {
        GameError::InvalidAction(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        GameError::Capacity(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GameError::NotFound(msg.into())
    }

    /// The HTTP status code an admin endpoint should answer with for this
    /// error kind (spec §6.2).
    pub fn http_status(&self) -> u16 {
        match self {
            GameError::NotFound(_) => 404,
            GameError::Capacity(_) | GameError::InvalidAction(_) => 400,
            GameError::Authentication(_) => 401,
            _ => 500,
        }
    }

    /// Short machine-readable reason, mirrored into `action_error` /
    /// JSON error bodies alongside the human-readable message.
    pub fn reason(&self) -> &'static str {
        match self {
            GameError::Authentication(_) => "Authentication",
            GameError::InvalidAction(_) => "InvalidAction",
            GameError::InvariantViolation(_) => "InvariantViolation",
            GameError::Timeout(_) => "Timeout",
            GameError::Transport(_) => "Transport",
            GameError::External(_) => "External",
            GameError::NotFound(_) => "NotFound",
            GameError::Capacity(_) => "Capacity",
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
