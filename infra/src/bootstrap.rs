//! Service wiring
//!
//! Loads configuration and assembles the token codec, state store, audit
//! sink and rotation engine for the configured state backend.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sg_core::domain::entities::audit::AuditEvent;
use sg_core::errors::DomainError;
use sg_core::repositories::{
    AuditLogRepository, MemoryStateStore, NoOpAuditLogRepository, SessionStateRepository,
};
use sg_core::services::{
    AuditService, AuditServiceConfig, RotationConfig, RotationEngine, SessionStateStore,
    StateCleanupConfig, StateCleanupService, StateStoreOptions,
};
use sg_core::TokenCodec;
use sg_shared::config::{AppConfig, CacheConfig, DatabaseConfig, Environment, StateBackend};

use crate::cache::{RedisClient, RedisSessionStateRepository};
use crate::database::{DatabasePool, MySqlAuditLogRepository, MySqlSessionStateRepository};
use crate::InfrastructureError;

/// Audit persistence selected at startup
pub enum AuditBackend {
    Mysql(MySqlAuditLogRepository),
    Noop(NoOpAuditLogRepository),
}

#[async_trait]
impl AuditLogRepository for AuditBackend {
    async fn create(&self, event: &AuditEvent) -> Result<(), DomainError> {
        match self {
            AuditBackend::Mysql(repo) => repo.create(event).await,
            AuditBackend::Noop(repo) => repo.create(event).await,
        }
    }

    async fn find_by_subject(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, DomainError> {
        match self {
            AuditBackend::Mysql(repo) => repo.find_by_subject(subject, limit).await,
            AuditBackend::Noop(repo) => repo.find_by_subject(subject, limit).await,
        }
    }
}

/// Everything a transport layer needs to serve login, refresh and logout
pub struct SessionServices {
    pub engine: Arc<RotationEngine<AuditBackend>>,
    pub store: Arc<SessionStateStore>,
    pub audit: Arc<AuditService<AuditBackend>>,
    pub database: Option<DatabasePool>,
    pub cleanup_task: Option<JoinHandle<()>>,
}

impl SessionServices {
    /// Stop the sweep task and close the database pool
    pub async fn shutdown(self) {
        if let Some(task) = self.cleanup_task {
            task.abort();
        }
        if let Some(database) = self.database {
            database.close().await;
        }
        info!("Session services stopped");
    }
}

/// Load `.env` files and the layered application configuration
///
/// `.env.<environment>` is read before `.env`; neither is required.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, InfrastructureError> {
    let environment = Environment::from_env();
    dotenvy::from_filename(environment.env_file()).ok();
    dotenvy::dotenv().ok();

    AppConfig::load(path).map_err(|e| InfrastructureError::Config(e.to_string()))
}

/// Build the session services for `config`
///
/// A durable backend that cannot be reached at startup is tolerated only when
/// memory fallback is allowed; otherwise startup fails. A tolerated backend
/// stays attached through a lazily connecting pool or client, so the store
/// moves back to it once it answers. A malformed URL always fails startup.
pub async fn build_session_services(
    config: &AppConfig,
) -> Result<SessionServices, InfrastructureError> {
    let session = &config.auth.session;

    let codec = TokenCodec::new(config.auth.jwt.clone())
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    let mut database = None;
    let mut audit_backend = AuditBackend::Noop(NoOpAuditLogRepository);
    let mut options = StateStoreOptions::from(session);

    let durable: Option<Arc<dyn SessionStateRepository>> = match session.backend {
        StateBackend::Mysql => {
            let pool = connect_mysql(&config.database, session.allow_memory_fallback).await?;

            let audit_repo = MySqlAuditLogRepository::new(pool.get_pool().clone());
            if let Err(e) = audit_repo.ensure_schema().await {
                warn!(error = %e, "Audit table not ready yet; retried on the next write");
            }
            audit_backend = AuditBackend::Mysql(audit_repo);

            let repo = MySqlSessionStateRepository::new(pool.get_pool().clone());
            database = Some(pool);
            Some(Arc::new(repo) as Arc<dyn SessionStateRepository>)
        }
        StateBackend::Redis => {
            let client = connect_redis(&config.cache, session.allow_memory_fallback).await?;
            let repo = RedisSessionStateRepository::new(client);
            Some(Arc::new(repo) as Arc<dyn SessionStateRepository>)
        }
        StateBackend::Memory => {
            info!("Session state kept in process memory only");
            options.allow_memory_fallback = true;
            None
        }
    };

    let store = Arc::new(SessionStateStore::new(
        durable,
        Arc::new(MemoryStateStore::new(session.memory_max_entries)),
        options,
    ));
    store
        .ensure_ready()
        .await
        .map_err(|e| InfrastructureError::General(e.to_string()))?;

    let audit = Arc::new(AuditService::new(
        Arc::new(audit_backend),
        AuditServiceConfig::default(),
    ));

    let engine = Arc::new(RotationEngine::new(
        Arc::new(codec),
        Arc::clone(&store),
        Arc::clone(&audit),
        RotationConfig::from(session),
    ));

    let cleanup_task = Arc::new(StateCleanupService::new(
        Arc::clone(&store),
        StateCleanupConfig::from(session),
    ))
    .start_background_task();

    info!(
        backend = ?session.backend,
        durable = store.has_durable(),
        memory_fallback = store.allows_memory_fallback(),
        grace_ms = session.refresh_grace_ms,
        "Session services ready"
    );

    Ok(SessionServices {
        engine,
        store,
        audit,
        database,
        cleanup_task,
    })
}

async fn connect_mysql(
    config: &DatabaseConfig,
    allow_memory_fallback: bool,
) -> Result<DatabasePool, InfrastructureError> {
    match DatabasePool::new(config.clone()).await {
        Ok(pool) => Ok(pool),
        Err(e) => {
            tolerate_outage("mysql", e, allow_memory_fallback)?;
            DatabasePool::new_lazy(config.clone())
        }
    }
}

async fn connect_redis(
    config: &CacheConfig,
    allow_memory_fallback: bool,
) -> Result<RedisClient, InfrastructureError> {
    match RedisClient::new(config.clone()).await {
        Ok(client) => Ok(client),
        Err(e) => {
            tolerate_outage("redis", e, allow_memory_fallback)?;
            RedisClient::new_lazy(config.clone())
        }
    }
}

/// Startup may continue past a connection failure only on memory fallback,
/// and never past a configuration error
fn tolerate_outage(
    backend: &str,
    error: InfrastructureError,
    allow_memory_fallback: bool,
) -> Result<(), InfrastructureError> {
    if allow_memory_fallback && !matches!(error, InfrastructureError::Config(_)) {
        warn!(
            backend,
            error = %error,
            "Durable state store unreachable, serving from memory until it recovers"
        );
        Ok(())
    } else {
        error!(backend, error = %error, "Durable state store unusable");
        Err(error)
    }
}
