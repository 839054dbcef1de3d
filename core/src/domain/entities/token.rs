//! Token entities for JWT-based session authentication.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Token type reported to clients alongside every pair
pub const BEARER: &str = "Bearer";

/// Distinguishes short-lived access tokens from rotating refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims structure for JWT payload
///
/// Claims are immutable once signed. Every issuance mints a fresh `jti`, which
/// is the identifier the revocation and grace state is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Issued at timestamp (seconds)
    pub iat: i64,

    /// Not before timestamp (seconds)
    pub nbf: i64,

    /// Expiration timestamp (seconds)
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// JWT ID (unique identifier for the token)
    pub jti: String,

    /// Access or refresh
    pub typ: TokenType,

    /// Whether the session was created with "remember me"
    #[serde(default)]
    pub remember: bool,
}

impl Claims {
    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Expiry as epoch milliseconds, the unit the state store works in
    pub fn expires_at_ms(&self) -> i64 {
        self.exp.saturating_mul(1000)
    }

    /// Epoch milliseconds until which a revocation marker must outlive the token
    ///
    /// Expiry is checked at whole-second resolution, so the token still
    /// decodes during its `exp` second. The marker covers that second too.
    pub fn revocation_expires_at_ms(&self) -> i64 {
        self.exp.saturating_add(1).saturating_mul(1000)
    }

    /// Remaining lifetime in seconds, never negative
    pub fn remaining_seconds(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Token pair returned to clients after login or rotation
///
/// The pair is serialisable so that it can be stored verbatim as the payload of
/// a grace entry and handed back unchanged to a duplicate rotation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,

    /// Whether the refresh token carries the long "remember me" lifetime
    pub remember: bool,
}

impl TokenPair {
    /// Creates a new bearer token pair
    pub fn new(
        access_token: String,
        refresh_token: String,
        access_expires_in: i64,
        refresh_expires_in: i64,
        remember: bool,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: BEARER.to_string(),
            access_expires_in,
            refresh_expires_in,
            remember,
        }
    }

    /// Serialise for storage as a grace payload
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a pair previously stored with [`TokenPair::to_payload`]
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
