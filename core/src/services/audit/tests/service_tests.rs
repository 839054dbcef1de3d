//! Tests for the AuditService.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::audit::AuditEventType;
use crate::repositories::audit::MockAuditLogRepository;
use crate::services::audit::{AuditService, AuditServiceConfig};

fn sync_service(repo: &Arc<MockAuditLogRepository>) -> AuditService<MockAuditLogRepository> {
    let config = AuditServiceConfig {
        async_writes: false, // Disable async for testing
    };
    AuditService::new(Arc::clone(repo), config)
}

#[tokio::test]
async fn test_log_login() {
    let repo = Arc::new(MockAuditLogRepository::new());
    let service = sync_service(&repo);

    service.log_login("u1", true, true, None).await;
    service.log_login("u1", false, false, Some("bad credentials")).await;

    let events = repo.get_all_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, AuditEventType::LoginSuccess);
    assert!(events[0].success);
    assert_eq!(events[0].remember, Some(true));
    assert_eq!(events[1].event_type, AuditEventType::LoginFailure);
    assert_eq!(events[1].failure_reason.as_deref(), Some("bad credentials"));
}

#[tokio::test]
async fn test_log_refresh_outcomes() {
    let repo = Arc::new(MockAuditLogRepository::new());
    let service = sync_service(&repo);

    service
        .log_refresh(
            AuditEventType::RefreshSuccess,
            Some("u1"),
            Some("jti-1"),
            Some(true),
            None,
        )
        .await;
    service
        .log_refresh(
            AuditEventType::RefreshReuseDetected,
            Some("u1"),
            Some("jti-1"),
            Some(false),
            Some("revoked token presented"),
        )
        .await;
    service
        .log_refresh(AuditEventType::RefreshFailure, None, None, None, Some("invalid"))
        .await;

    let events = repo.get_all_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].token_id.as_deref(), Some("jti-1"));
    assert_eq!(events[0].remember, Some(true));
    assert!(!events[1].success);
    assert_eq!(events[1].remember, Some(false));
    assert!(events[2].subject.is_none());
    assert!(events[2].remember.is_none());
}

#[tokio::test]
async fn test_log_logout_and_store_unavailable() {
    let repo = Arc::new(MockAuditLogRepository::new());
    let service = sync_service(&repo);

    service.log_logout("u1", "jti-1").await;
    service.log_store_unavailable("rotate", Some("jti-2")).await;

    assert_eq!(
        repo.event_types(),
        vec![AuditEventType::Logout, AuditEventType::StoreUnavailable]
    );
    let events = repo.get_all_events();
    assert!(events[1].failure_reason.as_deref().unwrap().contains("rotate"));
}

#[tokio::test]
async fn test_repository_failure_is_swallowed() {
    let repo = Arc::new(MockAuditLogRepository::new());
    repo.set_should_fail(true);
    let service = sync_service(&repo);

    // Must not panic or propagate
    service.log_logout("u1", "jti-1").await;
    assert!(repo.get_all_events().is_empty());
}

#[tokio::test]
async fn test_async_writes_land_eventually() {
    let repo = Arc::new(MockAuditLogRepository::new());
    let service = AuditService::new(Arc::clone(&repo), AuditServiceConfig::default());

    service.log_login("u1", true, false, None).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(repo.count(AuditEventType::LoginSuccess), 1);
}

#[tokio::test]
async fn test_get_subject_events() {
    let repo = Arc::new(MockAuditLogRepository::new());
    let service = sync_service(&repo);

    service.log_login("u1", true, false, None).await;
    service.log_login("u2", true, false, None).await;

    let events = service.get_subject_events("u1", 10).await.unwrap();
    assert_eq!(events.len(), 1);
}
