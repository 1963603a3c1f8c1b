//! Error types for LuckyDraw

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum LdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown prize tier: {0}")]
    UnknownTier(String),

    #[error("Prize tier '{0}' is protected and cannot be removed")]
    ProtectedTier(String),

    #[error("Invalid settings document: {0}")]
    InvalidDocument(String),

    #[error("A draw is already in progress")]
    DrawInFlight,
}

impl From<serde_json::Error> for LdError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias
pub type LdResult<T> = Result<T, LdError>;
