//! Error types for token handling and session state persistence

use thiserror::Error;

/// Token-related errors
///
/// Signature, expiry, issuer, audience and type failures all collapse into
/// `InvalidToken` so callers cannot distinguish between them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

/// Errors raised by session state repositories
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Insert hit an existing `(state_class, token_id)` key
    #[error("State entry already exists")]
    Duplicate,

    #[error("State store unavailable: {message}")]
    Unavailable { message: String },

    #[error("State store operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("State store serialization error: {message}")]
    Serialization { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
