//! State store adapter over the durable repository and the memory fallback

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sg_shared::config::SessionStateConfig;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::domain::entities::session_state::{now_ms, StateClass, StateEntry};
use crate::errors::{DomainError, StoreError};
use crate::repositories::session_state::{MemoryStateStore, SessionStateRepository};

/// Behaviour switches for [`SessionStateStore`]
#[derive(Debug, Clone)]
pub struct StateStoreOptions {
    /// Degrade to the memory store when the durable store fails
    pub allow_memory_fallback: bool,
    /// Upper bound for every durable call
    pub operation_timeout: Duration,
}

impl Default for StateStoreOptions {
    fn default() -> Self {
        Self {
            allow_memory_fallback: false,
            operation_timeout: Duration::from_millis(2_000),
        }
    }
}

impl From<&SessionStateConfig> for StateStoreOptions {
    fn from(config: &SessionStateConfig) -> Self {
        Self {
            allow_memory_fallback: config.allow_memory_fallback,
            operation_timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }
}

/// Outcome of a sweep over both stores
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub durable_removed: u64,
    pub memory_removed: usize,
    pub errors: Vec<String>,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.durable_removed + self.memory_removed as u64
    }
}

/// Revocation and grace state, backed by a durable repository with an
/// optional process-local fallback
///
/// Reads never fail: a durable read error is treated as "not found" and the
/// memory store is consulted when fallback is allowed. Writes go to the
/// durable store first and only land in memory when that fails and fallback
/// is allowed; otherwise the caller gets `StateStoreUnavailable`.
pub struct SessionStateStore {
    durable: Option<Arc<dyn SessionStateRepository>>,
    memory: Arc<MemoryStateStore>,
    options: StateStoreOptions,
    schema_ready: OnceCell<()>,
}

impl SessionStateStore {
    /// Create an adapter over an optional durable repository
    pub fn new(
        durable: Option<Arc<dyn SessionStateRepository>>,
        memory: Arc<MemoryStateStore>,
        options: StateStoreOptions,
    ) -> Self {
        Self {
            durable,
            memory,
            options,
            schema_ready: OnceCell::new(),
        }
    }

    /// Create an adapter with a durable repository
    pub fn with_durable(
        durable: Arc<dyn SessionStateRepository>,
        memory: Arc<MemoryStateStore>,
        options: StateStoreOptions,
    ) -> Self {
        Self::new(Some(durable), memory, options)
    }

    /// Create an adapter that only keeps process-local state
    pub fn memory_only(memory: Arc<MemoryStateStore>, options: StateStoreOptions) -> Self {
        Self::new(None, memory, options)
    }

    /// Create an adapter from configuration, sizing the memory store from
    /// `memory_max_entries`
    pub fn from_config(
        durable: Option<Arc<dyn SessionStateRepository>>,
        config: &SessionStateConfig,
    ) -> Self {
        Self::new(
            durable,
            Arc::new(MemoryStateStore::new(config.memory_max_entries)),
            StateStoreOptions::from(config),
        )
    }

    pub fn allows_memory_fallback(&self) -> bool {
        self.options.allow_memory_fallback
    }

    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// The fallback store
    pub fn memory(&self) -> &Arc<MemoryStateStore> {
        &self.memory
    }

    /// Make sure the durable store is usable
    ///
    /// # Returns
    /// * `Ok(true)` - Durable store ready (cached after the first success)
    /// * `Ok(false)` - Durable store absent or failing; memory fallback in use
    /// * `Err(DomainError::StateStoreUnavailable)` - Durable store absent or
    ///   failing and fallback is not permitted
    pub async fn ensure_ready(&self) -> Result<bool, DomainError> {
        let durable = match &self.durable {
            Some(durable) => durable,
            None => return self.fallback_or_unavailable("no durable store configured"),
        };

        if self.schema_ready.initialized() {
            return Ok(true);
        }

        let result = self
            .schema_ready
            .get_or_try_init(|| self.bounded("ensure_schema", durable.ensure_schema()))
            .await;

        match result {
            Ok(_) => {
                debug!("Durable session state store ready");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "Durable session state store not ready");
                self.fallback_or_unavailable("durable store not ready")
            }
        }
    }

    /// Look up a live entry
    ///
    /// Expired entries are never returned even if the backing store still
    /// holds them.
    pub async fn get(&self, class: StateClass, token_id: &str) -> Option<StateEntry> {
        let now = now_ms();

        if let Some(durable) = &self.durable {
            match self.bounded("find", durable.find(class, token_id)).await {
                Ok(Some(entry)) if !entry.is_expired_at(now) => return Some(entry),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        error = %e,
                        class = %class,
                        "Durable state read failed, treating as absent"
                    );
                }
            }
        }

        if self.options.allow_memory_fallback {
            return self.memory.get(class, token_id, now);
        }
        None
    }

    /// Insert or overwrite an entry
    ///
    /// The durable store is tried with insert, then update when the key
    /// already exists.
    pub async fn upsert(
        &self,
        class: StateClass,
        token_id: &str,
        expires_at_ms: i64,
        payload: Option<String>,
    ) -> Result<(), DomainError> {
        let entry = StateEntry::new(class, token_id, expires_at_ms, payload);

        if let Some(durable) = &self.durable {
            match self.write_durable(durable.as_ref(), &entry).await {
                Ok(()) => {
                    debug!(class = %class, token_id, "State entry written");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, class = %class, token_id, "Durable state write failed");
                }
            }
        }

        if self.options.allow_memory_fallback {
            self.memory.upsert(&entry);
            warn!(class = %class, token_id, "State entry written to memory fallback");
            Ok(())
        } else {
            Err(DomainError::StateStoreUnavailable)
        }
    }

    /// Write an entry only if no live entry holds the key
    ///
    /// This is the claim step for single-use keys: of several concurrent
    /// callers at most one gets `Ok(true)` from the same store.
    ///
    /// # Returns
    /// * `Ok(true)` - Entry written by this call
    /// * `Ok(false)` - A live entry already held the key
    /// * `Err(DomainError::StateStoreUnavailable)` - Durable store failing and
    ///   fallback is not permitted
    pub async fn insert_if_absent(
        &self,
        class: StateClass,
        token_id: &str,
        expires_at_ms: i64,
        payload: Option<String>,
    ) -> Result<bool, DomainError> {
        let entry = StateEntry::new(class, token_id, expires_at_ms, payload);

        if let Some(durable) = &self.durable {
            match self.claim_durable(durable.as_ref(), &entry).await {
                Ok(claimed) => {
                    debug!(class = %class, token_id, claimed, "State entry claim");
                    return Ok(claimed);
                }
                Err(e) => {
                    error!(error = %e, class = %class, token_id, "Durable state claim failed");
                }
            }
        }

        if !self.options.allow_memory_fallback {
            return Err(DomainError::StateStoreUnavailable);
        }

        match self.memory.insert_new(&entry, now_ms()) {
            Ok(()) => {
                warn!(class = %class, token_id, "State entry claimed in memory fallback");
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Remove an entry from both stores; failures are logged and ignored
    pub async fn delete(&self, class: StateClass, token_id: &str) {
        if let Some(durable) = &self.durable {
            if let Err(e) = self.bounded("delete", durable.delete(class, token_id)).await {
                warn!(error = %e, class = %class, token_id, "Durable state delete failed");
            }
        }
        self.memory.delete(class, token_id);
    }

    /// Remove every entry with `expires_at_ms <= now_ms` from both stores
    pub async fn sweep_expired(&self, now_ms: i64) -> SweepReport {
        let mut report = SweepReport::default();

        if let Some(durable) = &self.durable {
            match self.bounded("delete_expired", durable.delete_expired(now_ms)).await {
                Ok(removed) => report.durable_removed = removed,
                Err(e) => {
                    warn!(error = %e, "Durable state sweep failed");
                    report.errors.push(format!("Durable sweep error: {}", e));
                }
            }
        }

        report.memory_removed = self.memory.sweep_expired(now_ms);

        if report.total() > 0 {
            debug!(
                durable_removed = report.durable_removed,
                memory_removed = report.memory_removed,
                "Swept expired state entries"
            );
        }
        report
    }

    async fn write_durable(
        &self,
        durable: &dyn SessionStateRepository,
        entry: &StateEntry,
    ) -> Result<(), StoreError> {
        match self.bounded("insert", durable.insert(entry)).await {
            Err(StoreError::Duplicate) => self.bounded("update", durable.update(entry)).await,
            other => other,
        }
    }

    /// Insert, treating a duplicate key as lost unless the held row has expired
    async fn claim_durable(
        &self,
        durable: &dyn SessionStateRepository,
        entry: &StateEntry,
    ) -> Result<bool, StoreError> {
        match self.bounded("insert", durable.insert(entry)).await {
            Ok(()) => Ok(true),
            Err(StoreError::Duplicate) => {
                let held = self
                    .bounded("find", durable.find(entry.state_class, &entry.token_id))
                    .await?;
                match held {
                    Some(held) if !held.is_expired_at(now_ms()) => Ok(false),
                    _ => {
                        self.bounded("update", durable.update(entry)).await?;
                        Ok(true)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn bounded<T, F>(&self, operation: &str, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.options.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }

    fn fallback_or_unavailable(&self, reason: &str) -> Result<bool, DomainError> {
        if self.options.allow_memory_fallback {
            warn!(reason, "Using in-memory session state fallback");
            Ok(false)
        } else {
            error!(reason, "Session state store unavailable and memory fallback disabled");
            Err(DomainError::StateStoreUnavailable)
        }
    }
}
