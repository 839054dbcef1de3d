//! Business services: token codec, state store adapter, rotation engine and
//! audit sink.

pub mod audit;
pub mod rotation;
pub mod session_state;
pub mod token;

// Re-export commonly used types
pub use audit::{AuditService, AuditServiceConfig};
pub use rotation::{CredentialVerifier, RotationConfig, RotationEngine};
pub use session_state::{
    CleanupResult, SessionStateStore, StateCleanupConfig, StateCleanupService,
    StateStoreOptions, SweepReport,
};
pub use token::TokenCodec;
