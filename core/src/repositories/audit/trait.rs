//! Audit log repository trait defining the interface for audit persistence.

use async_trait::async_trait;

use crate::domain::entities::audit::AuditEvent;
use crate::errors::DomainError;

/// Repository trait for AuditEvent persistence operations
///
/// Implementations should write efficiently; the audit service never lets a
/// failed write abort a rotation or revocation, but slow writes still add
/// latency when asynchronous writes are disabled.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Create a new audit log entry
    ///
    /// # Arguments
    /// * `event` - The audit event to persist
    ///
    /// # Returns
    /// * `Ok(())` on successful creation
    /// * `Err(DomainError)` if the operation fails
    async fn create(&self, event: &AuditEvent) -> Result<(), DomainError>;

    /// Find audit events by subject
    ///
    /// # Arguments
    /// * `subject` - The subject to search for
    /// * `limit` - Maximum number of records to return
    ///
    /// # Returns
    /// * List of events for the subject, ordered by created_at descending
    async fn find_by_subject(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, DomainError>;
}
