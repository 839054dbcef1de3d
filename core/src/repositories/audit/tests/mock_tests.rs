//! Tests for the mock audit log repository implementation

use chrono::{Duration, Utc};

use crate::domain::entities::audit::{AuditEvent, AuditEventType};
use crate::repositories::audit::{MockAuditLogRepository, NoOpAuditLogRepository};
use crate::repositories::AuditLogRepository;

#[tokio::test]
async fn test_mock_create_and_retrieve() {
    let repo = MockAuditLogRepository::new();

    let event = AuditEvent::new(AuditEventType::LoginSuccess)
        .with_subject("u1")
        .with_token_id("jti-1");

    repo.create(&event).await.unwrap();

    let events = repo.get_all_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, AuditEventType::LoginSuccess);
    assert_eq!(repo.count(AuditEventType::LoginSuccess), 1);
}

#[tokio::test]
async fn test_mock_find_by_subject_newest_first() {
    let repo = MockAuditLogRepository::new();

    let mut older = AuditEvent::new(AuditEventType::LoginSuccess).with_subject("u1");
    older.created_at = Utc::now() - Duration::minutes(5);
    let newer = AuditEvent::new(AuditEventType::RefreshSuccess).with_subject("u1");
    let other = AuditEvent::new(AuditEventType::LoginSuccess).with_subject("u2");

    repo.create(&older).await.unwrap();
    repo.create(&newer).await.unwrap();
    repo.create(&other).await.unwrap();

    let events = repo.find_by_subject("u1", 10).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, AuditEventType::RefreshSuccess);

    let limited = repo.find_by_subject("u1", 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_mock_failure_mode() {
    let repo = MockAuditLogRepository::new();
    repo.set_should_fail(true);

    let event = AuditEvent::new(AuditEventType::Logout);
    assert!(repo.create(&event).await.is_err());
    assert!(repo.find_by_subject("u1", 10).await.is_err());

    repo.set_should_fail(false);
    assert!(repo.create(&event).await.is_ok());
}

#[tokio::test]
async fn test_noop_repository() {
    let repo = NoOpAuditLogRepository::new();
    let event = AuditEvent::new(AuditEventType::Logout).with_subject("u1");

    assert!(repo.create(&event).await.is_ok());
    assert!(repo.find_by_subject("u1", 10).await.unwrap().is_empty());
}
