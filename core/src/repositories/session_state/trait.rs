//! Session state repository trait defining the interface for revocation and
//! grace entry persistence.

use async_trait::async_trait;

use crate::domain::entities::session_state::{StateClass, StateEntry};
use crate::errors::StoreError;

/// Repository trait for StateEntry persistence operations
///
/// The key of every entry is `(state_class, token_id)`. Implementations are
/// the cross-process source of truth for revocation, so they must not
/// silently drop writes: any failure is reported as a `StoreError` and the
/// state store adapter decides whether to degrade to memory.
///
/// Implementations need not filter expired entries on `find`; the adapter
/// checks `expires_at_ms` on every read.
#[async_trait]
pub trait SessionStateRepository: Send + Sync {
    /// Create tables, indexes or key namespaces if they do not exist yet
    ///
    /// Called once before first use; the adapter caches the first success.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Find an entry by class and token id
    ///
    /// # Returns
    /// * `Ok(Some(StateEntry))` - Entry found (possibly expired)
    /// * `Ok(None)` - No entry for this key
    /// * `Err(StoreError)` - Backend failure
    async fn find(
        &self,
        state_class: StateClass,
        token_id: &str,
    ) -> Result<Option<StateEntry>, StoreError>;

    /// Insert a new entry
    ///
    /// # Returns
    /// * `Err(StoreError::Duplicate)` - An entry with the same key exists
    async fn insert(&self, entry: &StateEntry) -> Result<(), StoreError>;

    /// Overwrite expiry and payload of an existing entry
    async fn update(&self, entry: &StateEntry) -> Result<(), StoreError>;

    /// Delete an entry; deleting a missing key is not an error
    async fn delete(&self, state_class: StateClass, token_id: &str) -> Result<(), StoreError>;

    /// Delete every entry with `expires_at_ms <= now_ms` across all classes
    ///
    /// # Returns
    /// * Number of entries removed
    async fn delete_expired(&self, now_ms: i64) -> Result<u64, StoreError>;
}
