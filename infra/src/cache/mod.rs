//! Cache module - Redis-backed session state storage
//!
//! A Redis client with retry logic and a [`SessionStateRepository`]
//! implementation on top of it, for deployments that keep revocation state
//! in Redis instead of MySQL.
//!
//! [`SessionStateRepository`]: sg_core::repositories::SessionStateRepository

pub mod redis_client;
pub mod session_state_cache;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use session_state_cache::RedisSessionStateRepository;

pub use sg_shared::config::CacheConfig;
