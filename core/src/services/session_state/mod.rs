//! Session state module: the store adapter that holds revocation and grace
//! entries, and the background sweeper that expires them.

mod cleanup;
mod store;

#[cfg(test)]
pub(crate) mod tests;

pub use cleanup::{CleanupResult, StateCleanupConfig, StateCleanupService};
pub use store::{SessionStateStore, StateStoreOptions, SweepReport};
