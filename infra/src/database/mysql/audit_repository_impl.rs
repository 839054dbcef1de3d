//! MySQL implementation of the AuditLogRepository trait.
//!
//! Audit events are appended to `auth_audit_events` and never updated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use tokio::sync::OnceCell;
use uuid::Uuid;

use sg_core::domain::entities::audit::{AuditEvent, AuditEventType};
use sg_core::errors::DomainError;
use sg_core::repositories::AuditLogRepository;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS auth_audit_events (
        id CHAR(36) NOT NULL,
        event_type VARCHAR(40) NOT NULL,
        subject VARCHAR(255) NULL,
        token_id VARCHAR(64) NULL,
        remember BOOLEAN NULL,
        success BOOLEAN NOT NULL,
        failure_reason TEXT NULL,
        created_at DATETIME(3) NOT NULL,
        PRIMARY KEY (id),
        INDEX idx_auth_audit_events_subject (subject, created_at),
        INDEX idx_auth_audit_events_token (token_id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

/// MySQL implementation of AuditLogRepository
pub struct MySqlAuditLogRepository {
    /// Database connection pool
    pool: MySqlPool,
    /// Set once the audit table is known to exist
    schema_ready: OnceCell<()>,
}

impl MySqlAuditLogRepository {
    /// Create a new MySQL audit log repository
    ///
    /// # Arguments
    /// * `pool` - MySQL connection pool from SQLx
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            schema_ready: OnceCell::new(),
        }
    }

    /// Create the audit table if it does not exist yet
    ///
    /// Cached after the first success; a failure is retried by the next call,
    /// including the one every `create` makes.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(CREATE_TABLE_SQL)
                    .execute(&self.pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| DomainError::Internal {
                        message: format!("Failed to create audit table: {}", e),
                    })
            })
            .await?;
        Ok(())
    }

    /// Convert database row to AuditEvent entity
    fn row_to_audit_event(row: &sqlx::mysql::MySqlRow) -> Result<AuditEvent, DomainError> {
        let id: String = row.try_get("id").map_err(|e| DomainError::Internal {
            message: format!("Failed to get id: {}", e),
        })?;

        let event_type_str: String =
            row.try_get("event_type")
                .map_err(|e| DomainError::Internal {
                    message: format!("Failed to get event_type: {}", e),
                })?;

        let event_type =
            AuditEventType::parse(&event_type_str).ok_or_else(|| DomainError::Internal {
                message: format!("Unknown event type: {}", event_type_str),
            })?;

        Ok(AuditEvent {
            id: Uuid::parse_str(&id).map_err(|e| DomainError::Internal {
                message: format!("Invalid UUID: {}", e),
            })?,
            event_type,
            subject: row.try_get("subject").map_err(|e| DomainError::Internal {
                message: format!("Failed to get subject: {}", e),
            })?,
            token_id: row.try_get("token_id").map_err(|e| DomainError::Internal {
                message: format!("Failed to get token_id: {}", e),
            })?,
            remember: row.try_get("remember").map_err(|e| DomainError::Internal {
                message: format!("Failed to get remember: {}", e),
            })?,
            success: row.try_get("success").map_err(|e| DomainError::Internal {
                message: format!("Failed to get success: {}", e),
            })?,
            failure_reason: row
                .try_get("failure_reason")
                .map_err(|e| DomainError::Internal {
                    message: format!("Failed to get failure_reason: {}", e),
                })?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| DomainError::Internal {
                    message: format!("Failed to get created_at: {}", e),
                })?,
        })
    }
}

#[async_trait]
impl AuditLogRepository for MySqlAuditLogRepository {
    async fn create(&self, event: &AuditEvent) -> Result<(), DomainError> {
        self.ensure_schema().await?;

        let query = r#"
            INSERT INTO auth_audit_events (
                id, event_type, subject, token_id, remember,
                success, failure_reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(event.id.to_string())
            .bind(event.event_type.as_str())
            .bind(&event.subject)
            .bind(&event.token_id)
            .bind(event.remember)
            .bind(event.success)
            .bind(&event.failure_reason)
            .bind(event.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to create audit event: {}", e),
            })?;

        Ok(())
    }

    async fn find_by_subject(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, DomainError> {
        let query = r#"
            SELECT id, event_type, subject, token_id, remember,
                   success, failure_reason, created_at
            FROM auth_audit_events
            WHERE subject = ?
            ORDER BY created_at DESC
            LIMIT ?
        "#;

        let rows = sqlx::query(query)
            .bind(subject)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to find audit events by subject: {}", e),
            })?;

        rows.iter()
            .map(Self::row_to_audit_event)
            .collect::<Result<Vec<_>, _>>()
    }
}
