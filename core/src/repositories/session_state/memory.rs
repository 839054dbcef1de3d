//! Bounded, process-local store for revocation and grace entries.
//!
//! Used as the fallback when the durable store is unavailable and fallback is
//! permitted, and as the whole store when the `memory` backend is selected.
//! Each state class has its own map behind its own lock; a write is visible
//! completely or not at all.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::domain::entities::session_state::{now_ms, StateClass, StateEntry};
use crate::errors::StoreError;

use super::SessionStateRepository;

/// Minimum slack before the insertion-order queue is compacted
const MIN_COMPACT_THRESHOLD: usize = 64;

#[derive(Debug)]
struct Slot {
    seq: u64,
    expires_at_ms: i64,
    payload: Option<String>,
}

/// One map per state class. `order` records writes oldest first; an element
/// whose sequence number no longer matches the live slot is stale and skipped.
#[derive(Debug, Default)]
struct ClassMap {
    entries: HashMap<String, Slot>,
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

impl ClassMap {
    fn put(
        &mut self,
        token_id: &str,
        expires_at_ms: i64,
        payload: Option<String>,
        max: usize,
    ) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.insert(
            token_id.to_string(),
            Slot {
                seq,
                expires_at_ms,
                payload,
            },
        );
        self.order.push_back((seq, token_id.to_string()));

        let mut evicted = 0;
        while self.entries.len() > max {
            match self.order.pop_front() {
                Some((seq, id)) => {
                    if self.entries.get(&id).map(|slot| slot.seq) == Some(seq) {
                        self.entries.remove(&id);
                        evicted += 1;
                    }
                }
                None => break,
            }
        }

        if self.order.len() > max.saturating_mul(2).max(MIN_COMPACT_THRESHOLD) {
            self.compact();
        }
        evicted
    }

    fn get(&mut self, class: StateClass, token_id: &str, now_ms: i64) -> Option<StateEntry> {
        let expired = match self.entries.get(token_id) {
            Some(slot) => slot.expires_at_ms <= now_ms,
            None => return None,
        };
        if expired {
            self.entries.remove(token_id);
            return None;
        }

        self.entries.get(token_id).map(|slot| StateEntry {
            state_class: class,
            token_id: token_id.to_string(),
            expires_at_ms: slot.expires_at_ms,
            payload: slot.payload.clone(),
        })
    }

    fn contains_live(&self, token_id: &str, now_ms: i64) -> bool {
        self.entries
            .get(token_id)
            .map(|slot| slot.expires_at_ms > now_ms)
            .unwrap_or(false)
    }

    fn remove(&mut self, token_id: &str) -> bool {
        self.entries.remove(token_id).is_some()
    }

    fn sweep(&mut self, now_ms: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.expires_at_ms > now_ms);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.compact();
        }
        removed
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(seq, id)| entries.get(id).map(|slot| slot.seq) == Some(*seq));
    }
}

/// In-memory revocation/grace store with a hard per-class capacity
///
/// When a class is full the oldest write is evicted first. Expired entries are
/// never returned and are dropped lazily on read or eagerly by
/// [`MemoryStateStore::sweep_expired`].
#[derive(Debug)]
pub struct MemoryStateStore {
    revoked: Mutex<ClassMap>,
    grace: Mutex<ClassMap>,
    max_entries: usize,
}

impl MemoryStateStore {
    /// Create a store holding at most `max_entries` per class (at least 1)
    pub fn new(max_entries: usize) -> Self {
        Self {
            revoked: Mutex::new(ClassMap::default()),
            grace: Mutex::new(ClassMap::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Capacity per class
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn map(&self, class: StateClass) -> MutexGuard<'_, ClassMap> {
        let lock = match class {
            StateClass::Revoked => &self.revoked,
            StateClass::Grace => &self.grace,
        };
        // A panic while holding the lock cannot leave a slot half-written
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a live entry
    pub fn get(&self, class: StateClass, token_id: &str, now_ms: i64) -> Option<StateEntry> {
        self.map(class).get(class, token_id, now_ms)
    }

    /// Insert or overwrite an entry; a rewrite counts as the newest write
    ///
    /// # Returns
    /// * Number of entries evicted to respect the capacity
    pub fn upsert(&self, entry: &StateEntry) -> usize {
        let evicted = self.map(entry.state_class).put(
            &entry.token_id,
            entry.expires_at_ms,
            entry.payload.clone(),
            self.max_entries,
        );
        if evicted > 0 {
            debug!(
                class = %entry.state_class,
                evicted,
                "Memory state store at capacity, evicted oldest entries"
            );
        }
        evicted
    }

    /// Insert only if no live entry exists for the key
    pub fn insert_new(&self, entry: &StateEntry, now_ms: i64) -> Result<(), StoreError> {
        let mut map = self.map(entry.state_class);
        if map.contains_live(&entry.token_id, now_ms) {
            return Err(StoreError::Duplicate);
        }
        map.put(
            &entry.token_id,
            entry.expires_at_ms,
            entry.payload.clone(),
            self.max_entries,
        );
        Ok(())
    }

    /// Remove an entry
    ///
    /// # Returns
    /// * `true` if an entry was present
    pub fn delete(&self, class: StateClass, token_id: &str) -> bool {
        self.map(class).remove(token_id)
    }

    /// Remove every entry with `expires_at_ms <= now_ms` from both classes
    pub fn sweep_expired(&self, now_ms: i64) -> usize {
        StateClass::ALL
            .iter()
            .map(|class| self.map(*class).sweep(now_ms))
            .sum()
    }

    /// Number of entries currently held for a class, including expired ones
    /// not yet swept
    pub fn len(&self, class: StateClass) -> usize {
        self.map(class).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        StateClass::ALL.iter().all(|class| self.len(*class) == 0)
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl SessionStateRepository for MemoryStateStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find(
        &self,
        state_class: StateClass,
        token_id: &str,
    ) -> Result<Option<StateEntry>, StoreError> {
        Ok(self.get(state_class, token_id, now_ms()))
    }

    async fn insert(&self, entry: &StateEntry) -> Result<(), StoreError> {
        self.insert_new(entry, now_ms())
    }

    async fn update(&self, entry: &StateEntry) -> Result<(), StoreError> {
        self.upsert(entry);
        Ok(())
    }

    async fn delete(&self, state_class: StateClass, token_id: &str) -> Result<(), StoreError> {
        MemoryStateStore::delete(self, state_class, token_id);
        Ok(())
    }

    async fn delete_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        Ok(self.sweep_expired(now_ms) as u64)
    }
}
