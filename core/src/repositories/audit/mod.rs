//! Audit log repository module.

mod r#trait;
pub use r#trait::AuditLogRepository;

mod noop;
pub use noop::NoOpAuditLogRepository;

mod mock;
pub use mock::MockAuditLogRepository;

#[cfg(test)]
mod tests;
