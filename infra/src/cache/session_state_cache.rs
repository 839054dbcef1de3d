//! Redis implementation of the SessionStateRepository trait.
//!
//! Entries are stored as JSON under `{prefix}:{class}:{token_id}` with a
//! millisecond TTL matching `expires_at_ms`, so Redis drops expired entries
//! on its own and the periodic sweep has nothing to do here.

use async_trait::async_trait;
use tracing::debug;

use sg_core::domain::entities::session_state::{now_ms, StateClass, StateEntry};
use sg_core::errors::StoreError;
use sg_core::repositories::SessionStateRepository;

use super::redis_client::RedisClient;

/// Redis-backed session state repository
pub struct RedisSessionStateRepository {
    client: RedisClient,
}

impl RedisSessionStateRepository {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Storage key for `(class, token_id)`
    pub fn state_key(&self, class: StateClass, token_id: &str) -> String {
        self.client
            .config()
            .make_key(&format!("{}:{}", class.as_str(), token_id))
    }

    fn encode(entry: &StateEntry) -> Result<String, StoreError> {
        serde_json::to_string(entry).map_err(|e| StoreError::Serialization {
            message: format!("Failed to encode state entry: {}", e),
        })
    }

    fn decode(raw: &str) -> Result<StateEntry, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Serialization {
            message: format!("Failed to decode state entry: {}", e),
        })
    }
}

#[async_trait]
impl SessionStateRepository for RedisSessionStateRepository {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        if self.client.health_check().await? {
            Ok(())
        } else {
            Err(StoreError::unavailable("Redis did not answer PING"))
        }
    }

    async fn find(
        &self,
        state_class: StateClass,
        token_id: &str,
    ) -> Result<Option<StateEntry>, StoreError> {
        let key = self.state_key(state_class, token_id);
        match self.client.get(&key).await? {
            Some(raw) => Self::decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn insert(&self, entry: &StateEntry) -> Result<(), StoreError> {
        let ttl_ms = entry.ttl_ms(now_ms());
        if ttl_ms == 0 {
            debug!(token_id = %entry.token_id, "Skipping write of an already expired entry");
            return Ok(());
        }

        let key = self.state_key(entry.state_class, &entry.token_id);
        let written = self
            .client
            .set_if_absent(&key, &Self::encode(entry)?, ttl_ms as u64)
            .await?;

        if written {
            Ok(())
        } else {
            Err(StoreError::Duplicate)
        }
    }

    async fn update(&self, entry: &StateEntry) -> Result<(), StoreError> {
        let key = self.state_key(entry.state_class, &entry.token_id);
        let ttl_ms = entry.ttl_ms(now_ms());
        if ttl_ms == 0 {
            self.client.delete(&key).await?;
            return Ok(());
        }

        self.client
            .set_with_expiry_ms(&key, &Self::encode(entry)?, ttl_ms as u64)
            .await?;
        Ok(())
    }

    async fn delete(&self, state_class: StateClass, token_id: &str) -> Result<(), StoreError> {
        self.client
            .delete(&self.state_key(state_class, token_id))
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, _now_ms: i64) -> Result<u64, StoreError> {
        Ok(0)
    }
}
