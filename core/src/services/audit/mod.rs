//! Audit service module for recording session lifecycle outcomes.

mod service;

pub use service::{AuditService, AuditServiceConfig, AUDIT_TARGET};

#[cfg(test)]
mod tests;
