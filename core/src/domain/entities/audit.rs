//! Audit event entity for recording session lifecycle outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcomes of session operations worth auditing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    // Login events
    LoginSuccess,
    LoginFailure,

    // Refresh events
    RefreshSuccess,
    RefreshReplayed,
    RefreshFailure,
    RefreshReuseDetected,

    // Session events
    Logout,

    // Store events
    StoreUnavailable,
}

impl AuditEventType {
    /// Convert to string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILURE",
            Self::RefreshSuccess => "REFRESH_SUCCESS",
            Self::RefreshReplayed => "REFRESH_REPLAYED",
            Self::RefreshFailure => "REFRESH_FAILURE",
            Self::RefreshReuseDetected => "REFRESH_REUSE_DETECTED",
            Self::Logout => "LOGOUT",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOGIN_SUCCESS" => Some(Self::LoginSuccess),
            "LOGIN_FAILURE" => Some(Self::LoginFailure),
            "REFRESH_SUCCESS" => Some(Self::RefreshSuccess),
            "REFRESH_REPLAYED" => Some(Self::RefreshReplayed),
            "REFRESH_FAILURE" => Some(Self::RefreshFailure),
            "REFRESH_REUSE_DETECTED" => Some(Self::RefreshReuseDetected),
            "LOGOUT" => Some(Self::Logout),
            "STORE_UNAVAILABLE" => Some(Self::StoreUnavailable),
            _ => None,
        }
    }

    /// Whether this event type records a successful operation
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::LoginSuccess | Self::RefreshSuccess | Self::RefreshReplayed | Self::Logout
        )
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    /// Unique identifier for the log entry
    pub id: Uuid,

    /// What happened
    pub event_type: AuditEventType,

    /// Subject the event concerns, when known
    pub subject: Option<String>,

    /// Token id (jti) the event concerns, when known
    pub token_id: Option<String>,

    /// Remember flag of the session, when known
    pub remember: Option<bool>,

    /// Whether the operation succeeded
    pub success: bool,

    /// Failure reason for failed operations
    pub failure_reason: Option<String>,

    /// Timestamp when the event occurred
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create a new audit event; `success` follows from the event type
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            subject: None,
            token_id: None,
            remember: None,
            success: event_type.is_success(),
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Set the subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the token id
    pub fn with_token_id(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Set the remember flag
    pub fn with_remember(mut self, remember: bool) -> Self {
        self.remember = Some(remember);
        self
    }

    /// Set the failure reason
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}
