//! Integration tests for the Redis session state repository
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p sg_infra --test redis_state_store -- --ignored

use std::time::Duration;

use sg_core::domain::entities::session_state::now_ms;
use sg_core::{SessionStateRepository, StateClass, StateEntry, StoreError};
use sg_infra::cache::{CacheConfig, RedisClient, RedisSessionStateRepository};
use uuid::Uuid;

async fn repository() -> RedisSessionStateRepository {
    let config = CacheConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
    .with_prefix("sg_test");

    let repo = RedisSessionStateRepository::new(RedisClient::new(config).await.unwrap());
    repo.ensure_schema().await.unwrap();
    repo
}

fn token_id() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_key_layout() {
    let repo = repository().await;
    assert_eq!(
        repo.state_key(StateClass::Revoked, "abc"),
        "sg_test:revoked:abc"
    );
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_insert_find_delete() {
    let repo = repository().await;
    let entry = StateEntry::new(
        StateClass::Grace,
        token_id(),
        now_ms() + 60_000,
        Some(String::from("{\"access_token\":\"a\"}")),
    );

    repo.insert(&entry).await.unwrap();
    assert_eq!(
        repo.find(StateClass::Grace, &entry.token_id).await.unwrap(),
        Some(entry.clone())
    );
    assert_eq!(repo.insert(&entry).await, Err(StoreError::Duplicate));

    repo.delete(StateClass::Grace, &entry.token_id).await.unwrap();
    assert!(repo.find(StateClass::Grace, &entry.token_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_update_overwrites() {
    let repo = repository().await;
    let id = token_id();

    repo.insert(&StateEntry::revoked(&id, now_ms() + 1_000)).await.unwrap();
    let later = now_ms() + 60_000;
    repo.update(&StateEntry::revoked(&id, later)).await.unwrap();

    let found = repo.find(StateClass::Revoked, &id).await.unwrap().unwrap();
    assert_eq!(found.expires_at_ms, later);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_entries_expire_natively() {
    let repo = repository().await;
    let id = token_id();

    repo.insert(&StateEntry::revoked(&id, now_ms() + 100)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(repo.find(StateClass::Revoked, &id).await.unwrap().is_none());
    assert_eq!(repo.delete_expired(now_ms()).await.unwrap(), 0);
}
