//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

pub use types::{StoreError, TokenError};

use sg_shared::errors::{error_codes, ErrorResponse, IntoErrorResponse};
use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// Startup or signing configuration is unusable (e.g. missing secret)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Refresh token failed signature, expiry, type or claim checks
    #[error("Invalid refresh token")]
    InvalidRefresh,

    /// A revoked refresh token was presented outside its grace window
    #[error("Refresh token reuse detected")]
    ReuseDetected,

    /// Durable state store is down and memory fallback is not permitted
    #[error("Session state store unavailable")]
    StateStoreUnavailable,

    /// Credential verifier rejected the login
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// HTTP status the transport layer should answer with.
    ///
    /// `InvalidRefresh` and `ReuseDetected` are deliberately indistinguishable
    /// to clients.
    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::InvalidRefresh
            | DomainError::ReuseDetected
            | DomainError::Token(TokenError::InvalidToken) => 401,
            DomainError::AuthenticationFailed => 401,
            DomainError::StateStoreUnavailable | DomainError::Store(_) => 503,
            DomainError::Config { .. }
            | DomainError::Internal { .. }
            | DomainError::Token(TokenError::TokenGenerationFailed) => 500,
        }
    }

    /// Stable error code for the response body
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::InvalidRefresh
            | DomainError::ReuseDetected
            | DomainError::Token(TokenError::InvalidToken) => error_codes::TOKEN_INVALID,
            DomainError::AuthenticationFailed => error_codes::UNAUTHORIZED,
            DomainError::StateStoreUnavailable | DomainError::Store(_) => {
                error_codes::SERVICE_UNAVAILABLE
            }
            DomainError::Config { .. } => error_codes::CONFIGURATION_ERROR,
            DomainError::Internal { .. }
            | DomainError::Token(TokenError::TokenGenerationFailed) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether a client may retry the identical request later
    pub fn is_retryable(&self) -> bool {
        self.http_status() == 503
    }
}

impl IntoErrorResponse for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        // Token failures share one message so reuse is not revealed
        let message = match self.error_code() {
            error_codes::TOKEN_INVALID => "Invalid or expired token".to_string(),
            error_codes::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
            error_codes::CONFIGURATION_ERROR | error_codes::INTERNAL_ERROR => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let response = ErrorResponse::new(self.error_code(), message, self.http_status());
        if self.is_retryable() {
            response.retryable()
        } else {
            response
        }
    }
}
