//! Revocation and grace state entries keyed by refresh token id.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current wall clock as epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The two kinds of state tracked per refresh token id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateClass {
    /// The token was consumed by a rotation or explicitly revoked
    Revoked,
    /// The token was just rotated; its payload is the pair it rotated into
    Grace,
}

impl StateClass {
    /// All classes, in sweep order
    pub const ALL: [StateClass; 2] = [StateClass::Revoked, StateClass::Grace];

    /// Convert to string representation for storage keys and table names
    pub fn as_str(&self) -> &'static str {
        match self {
            StateClass::Revoked => "revoked",
            StateClass::Grace => "grace",
        }
    }
}

impl std::fmt::Display for StateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single state record. `(state_class, token_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub state_class: StateClass,
    pub token_id: String,
    /// Epoch milliseconds after which the entry must be ignored
    pub expires_at_ms: i64,
    /// Serialised `TokenPair` for grace entries
    pub payload: Option<String>,
}

impl StateEntry {
    pub fn new(
        state_class: StateClass,
        token_id: impl Into<String>,
        expires_at_ms: i64,
        payload: Option<String>,
    ) -> Self {
        Self {
            state_class,
            token_id: token_id.into(),
            expires_at_ms,
            payload,
        }
    }

    /// Shorthand for a revocation marker without payload
    pub fn revoked(token_id: impl Into<String>, expires_at_ms: i64) -> Self {
        Self::new(StateClass::Revoked, token_id, expires_at_ms, None)
    }

    /// Entries are dead at their expiry instant, not one tick later
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }

    /// Remaining lifetime in milliseconds relative to `now_ms`, never negative
    pub fn ttl_ms(&self, now_ms: i64) -> i64 {
        (self.expires_at_ms - now_ms).max(0)
    }
}
