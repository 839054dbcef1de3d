//! Audit service for recording login, rotation and revocation outcomes.
//!
//! Every event is emitted as a structured `tracing` event on the `audit`
//! target and forwarded to an [`AuditLogRepository`]. Repository failures are
//! logged and never surface to the caller.

use std::sync::Arc;
use tokio::task;
use tracing::{error, info, warn};

use crate::domain::entities::audit::{AuditEvent, AuditEventType};
use crate::errors::DomainResult;
use crate::repositories::AuditLogRepository;

/// Tracing target for audit events
pub const AUDIT_TARGET: &str = "audit";

/// Configuration for the audit service
#[derive(Debug, Clone)]
pub struct AuditServiceConfig {
    /// Whether to run repository writes in a background task
    pub async_writes: bool,
}

impl Default for AuditServiceConfig {
    fn default() -> Self {
        Self { async_writes: true }
    }
}

/// Audit sink for session events
pub struct AuditService<R>
where
    R: AuditLogRepository,
{
    repository: Arc<R>,
    config: AuditServiceConfig,
}

impl<R> AuditService<R>
where
    R: AuditLogRepository + 'static,
{
    /// Create a new audit service
    pub fn new(repository: Arc<R>, config: AuditServiceConfig) -> Self {
        Self { repository, config }
    }

    /// Record a login outcome
    pub async fn log_login(
        &self,
        subject: &str,
        success: bool,
        remember: bool,
        failure_reason: Option<&str>,
    ) {
        let event_type = if success {
            AuditEventType::LoginSuccess
        } else {
            AuditEventType::LoginFailure
        };
        let mut event = AuditEvent::new(event_type)
            .with_subject(subject)
            .with_remember(remember);
        if let Some(reason) = failure_reason {
            event = event.with_failure(reason);
        }
        self.record(event).await;
    }

    /// Record a refresh outcome
    ///
    /// # Arguments
    /// * `event_type` - One of the refresh event types
    /// * `subject` - Subject of the presented token, when it decoded
    /// * `token_id` - `jti` of the presented token, when it decoded
    /// * `remember` - Remember-me flag carried by the token, when it decoded
    /// * `failure_reason` - Why the refresh failed
    pub async fn log_refresh(
        &self,
        event_type: AuditEventType,
        subject: Option<&str>,
        token_id: Option<&str>,
        remember: Option<bool>,
        failure_reason: Option<&str>,
    ) {
        let mut event = AuditEvent::new(event_type);
        if let Some(subject) = subject {
            event = event.with_subject(subject);
        }
        if let Some(token_id) = token_id {
            event = event.with_token_id(token_id);
        }
        if let Some(remember) = remember {
            event = event.with_remember(remember);
        }
        if let Some(reason) = failure_reason {
            event = event.with_failure(reason);
        }
        self.record(event).await;
    }

    /// Record an explicit revocation
    pub async fn log_logout(&self, subject: &str, token_id: &str) {
        let event = AuditEvent::new(AuditEventType::Logout)
            .with_subject(subject)
            .with_token_id(token_id);
        self.record(event).await;
    }

    /// Record that the state store refused an operation
    pub async fn log_store_unavailable(&self, operation: &str, token_id: Option<&str>) {
        let mut event = AuditEvent::new(AuditEventType::StoreUnavailable)
            .with_failure(format!("state store unavailable during {}", operation));
        if let Some(token_id) = token_id {
            event = event.with_token_id(token_id);
        }
        self.record(event).await;
    }

    /// Get recent audit events for a subject
    pub async fn get_subject_events(
        &self,
        subject: &str,
        limit: usize,
    ) -> DomainResult<Vec<AuditEvent>> {
        self.repository.find_by_subject(subject, limit).await
    }

    /// Emit the tracing event and hand the record to the repository
    pub async fn record(&self, event: AuditEvent) {
        emit(&event);

        if self.config.async_writes {
            let repository = Arc::clone(&self.repository);
            task::spawn(async move {
                if let Err(e) = repository.create(&event).await {
                    error!(
                        error = %e,
                        event_type = %event.event_type,
                        "Failed to write audit event"
                    );
                }
            });
        } else if let Err(e) = self.repository.create(&event).await {
            error!(error = %e, event_type = %event.event_type, "Failed to write audit event");
        }
    }
}

fn emit(event: &AuditEvent) {
    let subject = event.subject.as_deref().unwrap_or("-");
    let token_id = event.token_id.as_deref().unwrap_or("-");
    let reason = event.failure_reason.as_deref().unwrap_or("");

    if event.success {
        info!(
            target: AUDIT_TARGET,
            event_type = %event.event_type,
            subject,
            token_id,
            remember = ?event.remember,
            "audit"
        );
    } else {
        warn!(
            target: AUDIT_TARGET,
            event_type = %event.event_type,
            subject,
            token_id,
            reason,
            "audit"
        );
    }
}
