//! Refresh token rotation module
//!
//! Owns the refresh-token lifecycle: rotation on use, grace-window replay,
//! reuse detection and explicit revocation.

mod credential;
mod engine;

#[cfg(test)]
mod tests;

pub use credential::CredentialVerifier;
pub use engine::{RotationConfig, RotationEngine};
