//! Credential verification seam used by login

use async_trait::async_trait;

use crate::errors::DomainError;

/// Checks a subject's credentials. Storage and hashing of credentials live
/// outside this crate.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// # Returns
    /// * `Ok(true)` - Credentials accepted
    /// * `Ok(false)` - Credentials rejected
    /// * `Err(DomainError)` - The verifier itself failed
    async fn verify(&self, subject: &str, secret: &str) -> Result<bool, DomainError>;
}
