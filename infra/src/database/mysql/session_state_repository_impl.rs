//! MySQL implementation of the SessionStateRepository trait.
//!
//! Each state class lives in its own table keyed by `token_id`:
//! `auth_revoked_tokens` and `auth_grace_tokens`. Expiry is an epoch
//! millisecond column with an index, so the periodic sweep is a single
//! range delete per table.

use async_trait::async_trait;
use sqlx::{MySqlPool, Row};
use tracing::debug;

use sg_core::domain::entities::session_state::{StateClass, StateEntry};
use sg_core::errors::StoreError;
use sg_core::repositories::SessionStateRepository;

/// MySQL implementation of SessionStateRepository
pub struct MySqlSessionStateRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlSessionStateRepository {
    /// Create a new MySQL session state repository
    ///
    /// # Arguments
    /// * `pool` - MySQL connection pool from SQLx
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Table holding entries of `class`
    pub fn table_name(class: StateClass) -> &'static str {
        match class {
            StateClass::Revoked => "auth_revoked_tokens",
            StateClass::Grace => "auth_grace_tokens",
        }
    }

    fn create_table_sql(class: StateClass) -> String {
        let table = Self::table_name(class);
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                token_id VARCHAR(64) NOT NULL,
                expires_at_ms BIGINT NOT NULL,
                payload TEXT NULL,
                created_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
                PRIMARY KEY (token_id),
                INDEX idx_{table}_expires_at (expires_at_ms)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
            "#
        )
    }

    /// Convert database row to StateEntry
    fn row_to_entry(
        class: StateClass,
        row: &sqlx::mysql::MySqlRow,
    ) -> Result<StateEntry, StoreError> {
        let token_id: String = row
            .try_get("token_id")
            .map_err(|e| StoreError::Serialization {
                message: format!("Failed to get token_id: {}", e),
            })?;

        let expires_at_ms: i64 = row
            .try_get("expires_at_ms")
            .map_err(|e| StoreError::Serialization {
                message: format!("Failed to get expires_at_ms: {}", e),
            })?;

        let payload: Option<String> = row
            .try_get("payload")
            .map_err(|e| StoreError::Serialization {
                message: format!("Failed to get payload: {}", e),
            })?;

        Ok(StateEntry::new(class, token_id, expires_at_ms, payload))
    }
}

/// Map a SQLx error to a store error, keeping unique violations distinct
fn map_sqlx_error(operation: &str, error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
    }
    StoreError::unavailable(format!("Failed to {} state entry: {}", operation, error))
}

#[async_trait]
impl SessionStateRepository for MySqlSessionStateRepository {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for class in StateClass::ALL {
            sqlx::query(&Self::create_table_sql(class))
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("prepare table for", e))?;
        }
        debug!("Session state tables ready");
        Ok(())
    }

    async fn find(
        &self,
        state_class: StateClass,
        token_id: &str,
    ) -> Result<Option<StateEntry>, StoreError> {
        let query = format!(
            "SELECT token_id, expires_at_ms, payload FROM {} WHERE token_id = ?",
            Self::table_name(state_class)
        );

        let row = sqlx::query(&query)
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("read", e))?;

        row.map(|row| Self::row_to_entry(state_class, &row))
            .transpose()
    }

    async fn insert(&self, entry: &StateEntry) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {} (token_id, expires_at_ms, payload) VALUES (?, ?, ?)",
            Self::table_name(entry.state_class)
        );

        sqlx::query(&query)
            .bind(&entry.token_id)
            .bind(entry.expires_at_ms)
            .bind(&entry.payload)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        Ok(())
    }

    async fn update(&self, entry: &StateEntry) -> Result<(), StoreError> {
        let query = format!(
            "UPDATE {} SET expires_at_ms = ?, payload = ? WHERE token_id = ?",
            Self::table_name(entry.state_class)
        );

        sqlx::query(&query)
            .bind(entry.expires_at_ms)
            .bind(&entry.payload)
            .bind(&entry.token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

        Ok(())
    }

    async fn delete(&self, state_class: StateClass, token_id: &str) -> Result<(), StoreError> {
        let query = format!(
            "DELETE FROM {} WHERE token_id = ?",
            Self::table_name(state_class)
        );

        sqlx::query(&query)
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(())
    }

    async fn delete_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        let mut removed = 0;

        for class in StateClass::ALL {
            let query = format!(
                "DELETE FROM {} WHERE expires_at_ms <= ?",
                Self::table_name(class)
            );

            let result = sqlx::query(&query)
                .bind(now_ms)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("sweep", e))?;

            removed += result.rows_affected();
        }

        Ok(removed)
    }
}
