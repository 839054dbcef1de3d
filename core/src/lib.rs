//! # SessionGuard Core
//!
//! Domain layer for the SessionGuard session backend.
//! This crate contains the token entities, the refresh-token rotation engine,
//! the revocation/grace state store adapter, the audit sink and the
//! repository interfaces the infrastructure layer implements.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod errors;

// Re-export commonly used types for convenience
pub use domain::entities::{
    AuditEvent, AuditEventType, Claims, StateClass, StateEntry, TokenPair, TokenType,
};
pub use errors::{DomainError, DomainResult, StoreError, TokenError};
pub use repositories::{
    AuditLogRepository, MemoryStateStore, MockAuditLogRepository, NoOpAuditLogRepository,
    SessionStateRepository,
};
pub use services::{
    AuditService, AuditServiceConfig, CleanupResult, CredentialVerifier, RotationConfig,
    RotationEngine, SessionStateStore, StateCleanupConfig, StateCleanupService,
    StateStoreOptions, SweepReport, TokenCodec,
};
