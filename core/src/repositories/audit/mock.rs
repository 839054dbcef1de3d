//! In-memory implementation of AuditLogRepository for tests and local runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::entities::audit::{AuditEvent, AuditEventType};
use crate::errors::DomainError;

use super::AuditLogRepository;

/// Mock implementation of AuditLogRepository that keeps events in memory
#[derive(Clone, Default)]
pub struct MockAuditLogRepository {
    events: Arc<Mutex<Vec<AuditEvent>>>,
    should_fail: Arc<AtomicBool>,
}

impl MockAuditLogRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether operations should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Get all stored events in insertion order
    pub fn get_all_events(&self) -> Vec<AuditEvent> {
        self.lock().clone()
    }

    /// Event types in insertion order
    pub fn event_types(&self) -> Vec<AuditEventType> {
        self.lock().iter().map(|event| event.event_type).collect()
    }

    /// Count stored events of one type
    pub fn count(&self, event_type: AuditEventType) -> usize {
        self.lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    /// Clear all events
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AuditEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failure(&self) -> Result<(), DomainError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::Internal {
                message: "Mock repository error".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for MockAuditLogRepository {
    async fn create(&self, event: &AuditEvent) -> Result<(), DomainError> {
        self.check_failure()?;
        self.lock().push(event.clone());
        Ok(())
    }

    async fn find_by_subject(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, DomainError> {
        self.check_failure()?;

        let mut result: Vec<AuditEvent> = self
            .lock()
            .iter()
            .filter(|event| event.subject.as_deref() == Some(subject))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);
        Ok(result)
    }
}
