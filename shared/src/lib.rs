//! Shared configuration and error response types for SessionGuard
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration types (JWT, session state store, database, cache, logging)
//! - Environment detection
//! - Error response structures and error codes for the HTTP layer

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, DatabaseConfig, Environment, JwtConfig, LogFormat,
    LoggingConfig, SessionStateConfig, StateBackend,
};
pub use errors::{error_codes, ApiResult, ErrorResponse, IntoErrorResponse};
