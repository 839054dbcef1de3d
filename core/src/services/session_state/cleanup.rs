//! State cleanup service for periodic removal of expired revocation and grace
//! entries
//!
//! Rotation sweeps opportunistically on every call; this task additionally
//! bounds the lifetime of entries on idle systems.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sg_shared::config::SessionStateConfig;

use crate::domain::entities::session_state::now_ms;

use super::store::SessionStateStore;

/// Configuration for the state cleanup service
#[derive(Debug, Clone)]
pub struct StateCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for StateCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            enabled: true,
        }
    }
}

impl From<&SessionStateConfig> for StateCleanupConfig {
    fn from(config: &SessionStateConfig) -> Self {
        Self {
            interval_seconds: config.sweep_interval_seconds,
            enabled: config.sweep_interval_seconds > 0,
        }
    }
}

/// Service for sweeping expired state entries on an interval
pub struct StateCleanupService {
    store: Arc<SessionStateStore>,
    config: StateCleanupConfig,
}

impl StateCleanupService {
    /// Create a new state cleanup service
    pub fn new(store: Arc<SessionStateStore>, config: StateCleanupConfig) -> Self {
        Self { store, config }
    }

    /// Run a single cleanup cycle
    ///
    /// Sweep failures on the durable store are reported in
    /// `CleanupResult::errors`; the memory store is always swept.
    pub async fn run_cleanup(&self) -> CleanupResult {
        if !self.config.enabled {
            return CleanupResult::default();
        }

        let report = self.store.sweep_expired(now_ms()).await;
        let result = CleanupResult {
            durable_entries_deleted: report.durable_removed,
            memory_entries_deleted: report.memory_removed,
            errors: report.errors,
        };

        info!(
            durable = result.durable_entries_deleted,
            memory = result.memory_entries_deleted,
            "State cleanup completed"
        );

        result
    }

    /// Start the cleanup service as a background task
    ///
    /// # Returns
    /// * `None` when the service is disabled
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled || self.config.interval_seconds == 0 {
            warn!("State cleanup service is disabled");
            return None;
        }

        let period = Duration::from_secs(self.config.interval_seconds);

        Some(tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval_seconds,
                "State cleanup service started"
            );

            let mut interval_timer = tokio::time::interval(period);

            loop {
                interval_timer.tick().await;

                let result = self.run_cleanup().await;
                if !result.is_success() {
                    warn!("Cleanup completed with errors: {:?}", result.errors);
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of expired entries deleted from the durable store
    pub durable_entries_deleted: u64,
    /// Number of expired entries deleted from the memory store
    pub memory_entries_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get total number of entries cleaned up
    pub fn total_cleaned(&self) -> u64 {
        self.durable_entries_deleted + self.memory_entries_deleted as u64
    }
}
