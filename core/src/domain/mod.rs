//! Domain layer containing token, session state and audit entities.

pub mod entities;

// Re-export commonly used domain types
pub use entities::*;
