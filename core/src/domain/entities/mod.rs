//! Domain entities representing core business objects.

pub mod audit;
pub mod session_state;
pub mod token;

// Re-export commonly used types
pub use audit::{AuditEvent, AuditEventType};
pub use session_state::{now_ms, StateClass, StateEntry};
pub use token::{Claims, TokenPair, TokenType, BEARER};
