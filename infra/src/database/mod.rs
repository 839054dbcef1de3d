//! Database module - MySQL implementations using SQLx
//!
//! - Connection pool management
//! - Session state (revoked and grace entries) persistence
//! - Audit event persistence

pub mod connection;
pub mod mysql;

#[cfg(test)]
mod tests;

pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::{MySqlAuditLogRepository, MySqlSessionStateRepository};
