//! Rotation engine implementation

use std::sync::Arc;
use std::time::Duration;

use sg_shared::config::SessionStateConfig;
use tracing::{debug, info, warn};

use crate::domain::entities::audit::AuditEventType;
use crate::domain::entities::session_state::{now_ms, StateClass, StateEntry};
use crate::domain::entities::token::{Claims, TokenPair, TokenType};
use crate::errors::DomainError;
use crate::repositories::AuditLogRepository;
use crate::services::audit::AuditService;
use crate::services::session_state::SessionStateStore;
use crate::services::token::TokenCodec;

use super::credential::CredentialVerifier;

/// Times a caller that lost the claim on a refresh token re-reads the grace
/// entry the winner is about to write
const GRACE_POLL_ATTEMPTS: u32 = 5;
const GRACE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration for the rotation engine
#[derive(Debug, Clone, Default)]
pub struct RotationConfig {
    /// Window (ms) in which a just-rotated refresh token returns the same
    /// pair instead of tripping reuse detection. 0 disables it.
    pub grace_ms: u64,
}

impl From<&SessionStateConfig> for RotationConfig {
    fn from(config: &SessionStateConfig) -> Self {
        Self {
            grace_ms: config.refresh_grace_ms,
        }
    }
}

/// Refresh-token state machine
///
/// Per refresh token id: Live, then Revoked (with an optional Grace entry
/// holding the pair it rotated into), then expired once its own `exp` passes.
/// The engine keeps no locks between calls; the state store is the only
/// shared state. Moving a token out of Live is an insert-if-absent of its
/// revocation marker, so concurrent presentations produce one successor.
pub struct RotationEngine<A>
where
    A: AuditLogRepository,
{
    codec: Arc<TokenCodec>,
    store: Arc<SessionStateStore>,
    audit: Arc<AuditService<A>>,
    config: RotationConfig,
}

impl<A> RotationEngine<A>
where
    A: AuditLogRepository + 'static,
{
    /// Creates a new rotation engine
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<SessionStateStore>,
        audit: Arc<AuditService<A>>,
        config: RotationConfig,
    ) -> Self {
        Self {
            codec,
            store,
            audit,
            config,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &SessionStateStore {
        &self.store
    }

    /// Issues the first pair of a session
    pub async fn issue_pair(
        &self,
        subject: &str,
        remember: bool,
    ) -> Result<TokenPair, DomainError> {
        let pair = self.codec.issue_pair(subject, remember)?;
        self.audit.log_login(subject, true, remember, None).await;
        Ok(pair)
    }

    /// Verifies credentials with `verifier` and issues a pair on success
    ///
    /// # Returns
    /// * `Err(DomainError::AuthenticationFailed)` - Credentials rejected
    pub async fn login(
        &self,
        subject: &str,
        secret: &str,
        remember: bool,
        verifier: &dyn CredentialVerifier,
    ) -> Result<TokenPair, DomainError> {
        if subject.is_empty() || !verifier.verify(subject, secret).await? {
            self.audit
                .log_login(subject, false, remember, Some("credentials rejected"))
                .await;
            return Err(DomainError::AuthenticationFailed);
        }

        self.issue_pair(subject, remember).await
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// A token presented again while its grace entry is live returns the pair
    /// it was first rotated into. Any other presentation of a revoked token is
    /// reuse.
    ///
    /// # Returns
    /// * `Err(DomainError::InvalidRefresh)` - Token failed verification
    /// * `Err(DomainError::ReuseDetected)` - Token already rotated or revoked
    /// * `Err(DomainError::StateStoreUnavailable)` - Nothing was issued or
    ///   persisted
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let claims = match self.decode_refresh(refresh_token) {
            Some(claims) => claims,
            None => {
                self.audit
                    .log_refresh(
                        AuditEventType::RefreshFailure,
                        None,
                        None,
                        None,
                        Some("invalid refresh token"),
                    )
                    .await;
                return Err(DomainError::InvalidRefresh);
            }
        };

        self.require_store("rotate", &claims).await?;

        self.store.sweep_expired(now_ms()).await;

        if self.store.get(StateClass::Revoked, &claims.jti).await.is_some() {
            return self.replay_or_reject(&claims, false).await;
        }

        let claimed = self
            .store
            .insert_if_absent(
                StateClass::Revoked,
                &claims.jti,
                claims.revocation_expires_at_ms(),
                None,
            )
            .await;
        match claimed {
            Ok(true) => {}
            Ok(false) => {
                debug!(token_id = %claims.jti, "Lost concurrent rotation of refresh token");
                return self.replay_or_reject(&claims, true).await;
            }
            Err(e) => {
                self.audit
                    .log_store_unavailable("rotate", Some(claims.jti.as_str()))
                    .await;
                return Err(e);
            }
        }

        let pair = self.codec.issue_pair(&claims.sub, claims.remember)?;

        if self.config.grace_ms > 0 {
            self.record_grace(&claims, &pair).await;
        } else {
            self.store.delete(StateClass::Grace, &claims.jti).await;
        }

        debug!(subject = %claims.sub, token_id = %claims.jti, "Refresh token rotated");
        self.audit
            .log_refresh(
                AuditEventType::RefreshSuccess,
                Some(claims.sub.as_str()),
                Some(claims.jti.as_str()),
                Some(claims.remember),
                None,
            )
            .await;

        Ok(pair)
    }

    /// Revokes a refresh token without issuing a replacement
    ///
    /// Tokens that do not verify are ignored, so logout is always safe to
    /// call. Any grace entry for the token is removed, which ends replay.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), DomainError> {
        let claims = match self.decode_refresh(refresh_token) {
            Some(claims) => claims,
            None => {
                debug!("Ignoring revocation of an invalid refresh token");
                return Ok(());
            }
        };

        self.require_store("revoke", &claims).await?;

        if let Err(e) = self
            .store
            .upsert(
                StateClass::Revoked,
                &claims.jti,
                claims.revocation_expires_at_ms(),
                None,
            )
            .await
        {
            self.audit
                .log_store_unavailable("revoke", Some(claims.jti.as_str()))
                .await;
            return Err(e);
        }
        self.store.delete(StateClass::Grace, &claims.jti).await;

        info!(subject = %claims.sub, token_id = %claims.jti, "Refresh token revoked");
        self.audit.log_logout(&claims.sub, &claims.jti).await;
        Ok(())
    }

    /// Validates an access token and returns its subject
    pub async fn validate_access(&self, access_token: &str) -> Result<String, DomainError> {
        let claims = self.codec.decode(access_token, TokenType::Access)?;
        Ok(claims.sub)
    }

    fn decode_refresh(&self, refresh_token: &str) -> Option<Claims> {
        self.codec
            .decode(refresh_token, TokenType::Refresh)
            .ok()
            .filter(|claims| !claims.sub.is_empty() && !claims.jti.is_empty())
    }

    async fn require_store(&self, operation: &str, claims: &Claims) -> Result<(), DomainError> {
        if let Err(e) = self.store.ensure_ready().await {
            self.audit
                .log_store_unavailable(operation, Some(claims.jti.as_str()))
                .await;
            return Err(e);
        }
        Ok(())
    }

    /// Serve the grace pair for an already rotated token, or report reuse
    ///
    /// With `await_winner` the grace entry is polled briefly, since the
    /// caller that won the claim writes it only after issuing the pair.
    async fn replay_or_reject(
        &self,
        claims: &Claims,
        await_winner: bool,
    ) -> Result<TokenPair, DomainError> {
        if let Some(grace) = self.grace_entry(claims, await_winner).await {
            match grace.payload.as_deref().map(TokenPair::from_payload) {
                Some(Ok(pair)) => {
                    debug!(
                        subject = %claims.sub,
                        token_id = %claims.jti,
                        "Refresh replayed within grace window"
                    );
                    self.audit
                        .log_refresh(
                            AuditEventType::RefreshReplayed,
                            Some(claims.sub.as_str()),
                            Some(claims.jti.as_str()),
                            Some(claims.remember),
                            None,
                        )
                        .await;
                    return Ok(pair);
                }
                Some(Err(e)) => {
                    warn!(error = %e, token_id = %claims.jti, "Unreadable grace payload");
                }
                None => {
                    warn!(token_id = %claims.jti, "Grace entry without payload");
                }
            }
        }

        warn!(subject = %claims.sub, token_id = %claims.jti, "Refresh token reuse detected");
        self.audit
            .log_refresh(
                AuditEventType::RefreshReuseDetected,
                Some(claims.sub.as_str()),
                Some(claims.jti.as_str()),
                Some(claims.remember),
                Some("revoked refresh token presented"),
            )
            .await;
        Err(DomainError::ReuseDetected)
    }

    async fn grace_entry(&self, claims: &Claims, await_winner: bool) -> Option<StateEntry> {
        let attempts = if await_winner && self.config.grace_ms > 0 {
            GRACE_POLL_ATTEMPTS
        } else {
            1
        };

        for attempt in 1..=attempts {
            if let Some(entry) = self.store.get(StateClass::Grace, &claims.jti).await {
                return Some(entry);
            }
            if attempt < attempts {
                tokio::time::sleep(GRACE_POLL_INTERVAL).await;
            }
        }
        None
    }

    /// A failed grace write only costs the replay convenience; the rotation
    /// itself has already been committed.
    async fn record_grace(&self, claims: &Claims, pair: &TokenPair) {
        let payload = match pair.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, token_id = %claims.jti, "Could not serialise grace payload");
                return;
            }
        };

        let grace_ms = i64::try_from(self.config.grace_ms).unwrap_or(i64::MAX);
        let expires_at_ms = now_ms().saturating_add(grace_ms);
        if let Err(e) = self
            .store
            .upsert(StateClass::Grace, &claims.jti, expires_at_ms, Some(payload))
            .await
        {
            warn!(error = %e, token_id = %claims.jti, "Grace entry not recorded");
        }
    }
}
