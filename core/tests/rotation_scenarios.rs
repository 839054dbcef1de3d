//! End-to-end refresh rotation scenarios through the public API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sg_core::{
    AuditEventType, AuditService, AuditServiceConfig, DomainError, MemoryStateStore,
    MockAuditLogRepository, RotationConfig, RotationEngine, SessionStateRepository,
    SessionStateStore, StateClass, StateEntry, StateStoreOptions, StoreError, TokenCodec,
    TokenType,
};
use sg_shared::config::{JwtConfig, SessionStateConfig};

const GRACE_MS: u64 = 200;

/// Durable store that can be switched off
struct SwitchableStore {
    inner: MemoryStateStore,
    down: AtomicBool,
}

impl SwitchableStore {
    fn new() -> Self {
        Self {
            inner: MemoryStateStore::new(1_000),
            down: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStateRepository for SwitchableStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn find(
        &self,
        class: StateClass,
        token_id: &str,
    ) -> Result<Option<StateEntry>, StoreError> {
        self.check()?;
        self.inner.find(class, token_id).await
    }

    async fn insert(&self, entry: &StateEntry) -> Result<(), StoreError> {
        self.check()?;
        SessionStateRepository::insert(&self.inner, entry).await
    }

    async fn update(&self, entry: &StateEntry) -> Result<(), StoreError> {
        self.check()?;
        SessionStateRepository::update(&self.inner, entry).await
    }

    async fn delete(&self, class: StateClass, token_id: &str) -> Result<(), StoreError> {
        self.check()?;
        SessionStateRepository::delete(&self.inner, class, token_id).await
    }

    async fn delete_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.delete_expired(now_ms).await
    }
}

struct Setup {
    engine: RotationEngine<MockAuditLogRepository>,
    durable: Arc<SwitchableStore>,
    audit: Arc<MockAuditLogRepository>,
}

fn setup(allow_memory_fallback: bool) -> Setup {
    let session = SessionStateConfig::default()
        .with_grace_ms(GRACE_MS)
        .with_memory_fallback(allow_memory_fallback);

    let durable = Arc::new(SwitchableStore::new());
    let store = Arc::new(SessionStateStore::from_config(
        Some(durable.clone() as Arc<dyn SessionStateRepository>),
        &session,
    ));
    let codec = Arc::new(TokenCodec::new(JwtConfig::new("scenario-secret")).unwrap());
    let audit = Arc::new(MockAuditLogRepository::new());
    let audit_service = Arc::new(AuditService::new(
        audit.clone(),
        AuditServiceConfig { async_writes: false },
    ));

    Setup {
        engine: RotationEngine::new(codec, store, audit_service, RotationConfig::from(&session)),
        durable,
        audit,
    }
}

#[tokio::test]
async fn remembered_session_grace_then_reuse_then_continue_chain() {
    let s = setup(false);

    let r0 = s.engine.issue_pair("u1", true).await.unwrap();

    let r1 = s.engine.rotate(&r0.refresh_token).await.unwrap();
    assert!(r1.remember);

    // Parallel tab retries inside the grace window and gets the same pair
    let again = s.engine.rotate(&r0.refresh_token).await.unwrap();
    assert_eq!(again, r1);

    tokio::time::sleep(Duration::from_millis(GRACE_MS + 100)).await;

    let reused = s.engine.rotate(&r0.refresh_token).await;
    assert!(matches!(reused, Err(DomainError::ReuseDetected)));

    let r2 = s.engine.rotate(&r1.refresh_token).await.unwrap();
    assert_ne!(r2.refresh_token, r1.refresh_token);
    assert_eq!(s.engine.validate_access(&r2.access_token).await.unwrap(), "u1");

    assert_eq!(
        s.audit.event_types(),
        vec![
            AuditEventType::LoginSuccess,
            AuditEventType::RefreshSuccess,
            AuditEventType::RefreshReplayed,
            AuditEventType::RefreshReuseDetected,
            AuditEventType::RefreshSuccess,
        ]
    );
}

#[tokio::test]
async fn logout_then_refresh_fails() {
    let s = setup(false);
    let pair = s.engine.issue_pair("u1", false).await.unwrap();

    s.engine.revoke(&pair.refresh_token).await.unwrap();

    let result = s.engine.rotate(&pair.refresh_token).await;
    assert!(matches!(result, Err(DomainError::ReuseDetected)));

    let claims = s
        .engine
        .codec()
        .decode(&pair.refresh_token, TokenType::Refresh)
        .unwrap();
    assert!(s.durable.inner.get(StateClass::Grace, &claims.jti, 0).is_none());
}

#[tokio::test]
async fn durable_outage_without_fallback_issues_nothing() {
    let s = setup(false);
    let pair = s.engine.issue_pair("u1", false).await.unwrap();
    s.durable.down.store(true, Ordering::SeqCst);

    let result = s.engine.rotate(&pair.refresh_token).await;
    assert!(matches!(result, Err(DomainError::StateStoreUnavailable)));
    assert_eq!(result.unwrap_err().http_status(), 503);

    s.durable.down.store(false, Ordering::SeqCst);
    assert!(s.durable.inner.is_empty());
    assert!(s.engine.store().memory().is_empty());
}

#[tokio::test]
async fn durable_outage_with_fallback_keeps_rotating() {
    let s = setup(true);
    let pair = s.engine.issue_pair("u1", false).await.unwrap();
    s.durable.down.store(true, Ordering::SeqCst);

    let next = s.engine.rotate(&pair.refresh_token).await.unwrap();
    let after = s.engine.rotate(&next.refresh_token).await.unwrap();
    assert_ne!(after.refresh_token, next.refresh_token);

    // Revocations recorded during the outage are still enforced afterwards
    s.durable.down.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(GRACE_MS + 100)).await;
    let reused = s.engine.rotate(&pair.refresh_token).await;
    assert!(matches!(reused, Err(DomainError::ReuseDetected)));
}

#[tokio::test]
async fn reuse_and_invalid_look_identical_to_clients() {
    let s = setup(false);
    let pair = s.engine.issue_pair("u1", false).await.unwrap();
    s.engine.revoke(&pair.refresh_token).await.unwrap();

    let reuse = s.engine.rotate(&pair.refresh_token).await.unwrap_err();
    let invalid = s.engine.rotate("garbage").await.unwrap_err();

    assert_eq!(reuse.http_status(), invalid.http_status());
    assert_eq!(reuse.error_code(), invalid.error_code());
}
