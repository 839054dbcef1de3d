//! Scriptable session state repository for exercising failure paths

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::entities::session_state::{StateClass, StateEntry};
use crate::errors::StoreError;
use crate::repositories::session_state::{MemoryStateStore, SessionStateRepository};

/// Durable repository backed by a memory store that can be told to fail or
/// to stall
#[derive(Default)]
pub(crate) struct FlakyStateRepository {
    inner: MemoryStateStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_schema: AtomicBool,
    fail_grace_writes: AtomicBool,
    stall: AtomicBool,
    read_delay_ms: AtomicU64,
    pub schema_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
}

impl FlakyStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation
    pub fn set_down(&self, down: bool) {
        self.fail_reads.store(down, Ordering::SeqCst);
        self.fail_writes.store(down, Ordering::SeqCst);
        self.fail_schema.store(down, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail only writes of grace entries
    pub fn set_fail_grace_writes(&self, fail: bool) {
        self.fail_grace_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every operation sleep far beyond any test timeout
    pub fn set_stall(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    /// Delay every read, widening the window between a lookup and a write
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Direct view of what was durably persisted
    pub fn stored(&self, class: StateClass, token_id: &str) -> Option<StateEntry> {
        self.inner.get(class, token_id, i64::MIN)
    }

    pub fn len(&self, class: StateClass) -> usize {
        self.inner.len(class)
    }

    async fn gate(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("scripted failure"));
        }
        Ok(())
    }

    fn gate_class(&self, class: StateClass) -> Result<(), StoreError> {
        if class == StateClass::Grace && self.fail_grace_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("scripted grace failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStateRepository for FlakyStateRepository {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        self.gate(&self.fail_schema).await
    }

    async fn find(
        &self,
        state_class: StateClass,
        token_id: &str,
    ) -> Result<Option<StateEntry>, StoreError> {
        self.gate(&self.fail_reads).await?;
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        // Hand back expired rows too, as a SQL backend would
        Ok(self.inner.get(state_class, token_id, i64::MIN))
    }

    async fn insert(&self, entry: &StateEntry) -> Result<(), StoreError> {
        self.gate(&self.fail_writes).await?;
        self.gate_class(entry.state_class)?;
        self.inner.insert_new(entry, i64::MIN)
    }

    async fn update(&self, entry: &StateEntry) -> Result<(), StoreError> {
        self.gate(&self.fail_writes).await?;
        self.gate_class(entry.state_class)?;
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(entry);
        Ok(())
    }

    async fn delete(&self, state_class: StateClass, token_id: &str) -> Result<(), StoreError> {
        self.gate(&self.fail_writes).await?;
        self.inner.delete(state_class, token_id);
        Ok(())
    }

    async fn delete_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        self.gate(&self.fail_writes).await?;
        Ok(self.inner.sweep_expired(now_ms) as u64)
    }
}
