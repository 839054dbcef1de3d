//! MySQL repository implementations

mod audit_repository_impl;
mod session_state_repository_impl;

pub use audit_repository_impl::MySqlAuditLogRepository;
pub use session_state_repository_impl::MySqlSessionStateRepository;
