//! # Infrastructure Layer
//!
//! Concrete implementations of the SessionGuard persistence traits and the
//! process wiring around them.
//!
//! ## Architecture
//!
//! - **Database**: MySQL session state and audit repositories using SQLx
//! - **Cache**: Redis client and Redis session state repository
//! - **Telemetry**: `tracing-subscriber` initialisation
//! - **Bootstrap**: configuration loading and service construction

/// Database module - MySQL implementations using SQLx
pub mod database;

/// Cache module - Redis client and state storage
pub mod cache;

pub mod bootstrap;
pub mod telemetry;

pub use bootstrap::{build_session_services, load_config, AuditBackend, SessionServices};
pub use telemetry::init_tracing;

use sg_core::errors::StoreError;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<InfrastructureError> for StoreError {
    fn from(error: InfrastructureError) -> Self {
        StoreError::unavailable(error.to_string())
    }
}
