//! Session state repository module: the durable persistence interface for
//! revocation and grace entries, plus the bounded in-memory store.

mod r#trait;
pub use r#trait::SessionStateRepository;

mod memory;
pub use memory::MemoryStateStore;
