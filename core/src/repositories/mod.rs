//! Repository interfaces for session state and audit persistence.

pub mod audit;
pub mod session_state;

pub use audit::{AuditLogRepository, MockAuditLogRepository, NoOpAuditLogRepository};
pub use session_state::{MemoryStateStore, SessionStateRepository};
