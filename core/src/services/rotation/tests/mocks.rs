//! Mock collaborators for rotation engine tests

use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::DomainError;
use crate::services::rotation::CredentialVerifier;

/// Accepts exactly the configured subject/secret pairs
pub(super) struct StaticCredentials {
    accounts: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn with(subject: &str, secret: &str) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(subject.to_string(), secret.to_string());
        Self { accounts }
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, subject: &str, secret: &str) -> Result<bool, DomainError> {
        Ok(self.accounts.get(subject).map(|s| s == secret).unwrap_or(false))
    }
}

/// Verifier whose backend is down
pub(super) struct BrokenVerifier;

#[async_trait]
impl CredentialVerifier for BrokenVerifier {
    async fn verify(&self, _subject: &str, _secret: &str) -> Result<bool, DomainError> {
        Err(DomainError::Internal {
            message: "credential backend unreachable".to_string(),
        })
    }
}
