//! Redis client implementation
//!
//! A Redis client with a multiplexed connection, retry logic with
//! exponential backoff, and the handful of commands the session state store
//! needs: conditional set with millisecond expiry, get, delete and ping.
//!
//! The connection is opened once and shared. A client created lazily, or one
//! whose server was down, opens it on the next command instead.

use redis::{
    aio::MultiplexedConnection, AsyncCommands, Client, ErrorKind, RedisError, RedisResult,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use sg_shared::config::CacheConfig;

use crate::InfrastructureError;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis client with a shared multiplexed connection and retry logic
#[derive(Clone)]
pub struct RedisClient {
    /// Client used to open the connection
    client: Client,
    /// Redis multiplexed connection for async operations, once opened
    connection: Arc<OnceCell<MultiplexedConnection>>,
    /// Configuration used to create this client
    config: CacheConfig,
    /// Maximum number of attempts for operations
    max_retries: u32,
    /// Base delay between retries (exponential backoff)
    retry_delay_ms: u64,
}

impl RedisClient {
    /// Create a new Redis client
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        let max_retries = config.max_retries.max(1);
        Self::new_with_retry_config(config, max_retries, 100).await
    }

    /// Create a new Redis client with custom retry configuration
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    /// * `max_retries` - Maximum number of attempts
    /// * `retry_delay_ms` - Base delay between retries in milliseconds
    pub async fn new_with_retry_config(
        config: CacheConfig,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.url), "Creating Redis client");

        let client = open_client(&config)?;

        let connection = Self::create_connection_with_retry(
            &client,
            Duration::from_secs(config.connection_timeout),
            max_retries,
            retry_delay_ms,
        )
        .await
        .map_err(InfrastructureError::Cache)?;

        info!("Redis client created successfully");

        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new_with(Some(connection))),
            config,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a client that connects on its first command
    ///
    /// Only the URL is checked here. While the server is unreachable every
    /// command fails and the next one tries to connect again.
    ///
    /// # Returns
    /// * `Err(InfrastructureError::Config)` - The URL does not parse
    pub fn new_lazy(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.url), "Creating lazy Redis client");

        let client = open_client(&config)?;
        let max_retries = config.max_retries.max(1);

        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new()),
            config,
            max_retries,
            retry_delay_ms: 100,
        })
    }

    /// Whether the shared connection has been opened
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        self.connection
            .get_or_try_init(|| {
                Self::create_connection_with_retry(
                    &self.client,
                    Duration::from_secs(self.config.connection_timeout),
                    1,
                    self.retry_delay_ms,
                )
            })
            .await
            .cloned()
    }

    async fn create_connection_with_retry(
        client: &Client,
        timeout: Duration,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> RedisResult<MultiplexedConnection> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Attempting to connect to Redis");

            let connect = client.get_multiplexed_async_connection();
            let result = match tokio::time::timeout(timeout, connect).await {
                Ok(result) => result,
                Err(_) => Err(RedisError::from((ErrorKind::IoError, "connection timed out"))),
            };

            match result {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 5 seconds
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!(attempts, error = %e, "Failed to connect to Redis");
                    return Err(e);
                }
            }
        }
    }

    /// Configuration this client was created from
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Set `key` only if it does not exist, expiring after `ttl_ms`
    ///
    /// # Returns
    /// * `Ok(true)` - Key was written
    /// * `Ok(false)` - Key already existed and was left untouched
    pub async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_ms: u64,
    ) -> Result<bool, InfrastructureError> {
        debug!(key, ttl_ms, "SET NX");

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let value = value.to_string();

                Box::pin(async move {
                    redis::cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg("NX")
                        .arg("PX")
                        .arg(ttl_ms)
                        .query_async::<_, Option<String>>(&mut conn)
                        .await
                })
            })
            .await;

        match result {
            Ok(reply) => Ok(reply.is_some()),
            Err(e) => {
                error!(key, error = %e, "Failed to set key");
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Set `key` unconditionally, expiring after `ttl_ms`
    pub async fn set_with_expiry_ms(
        &self,
        key: &str,
        value: &str,
        ttl_ms: u64,
    ) -> Result<(), InfrastructureError> {
        debug!(key, ttl_ms, "SET");

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let value = value.to_string();

                Box::pin(async move {
                    redis::cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg("PX")
                        .arg(ttl_ms)
                        .query_async::<_, ()>(&mut conn)
                        .await
                })
            })
            .await;

        result.map_err(|e| {
            error!(key, error = %e, "Failed to set key");
            InfrastructureError::Cache(e)
        })
    }

    /// Get a value
    ///
    /// # Returns
    /// * `Ok(None)` - Key missing or expired
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        debug!(key, "GET");

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.get::<_, Option<String>>(key).await })
            })
            .await;

        result.map_err(|e| {
            error!(key, error = %e, "Failed to get key");
            InfrastructureError::Cache(e)
        })
    }

    /// Delete a key
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if key was deleted, false if not found
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        debug!(key, "DEL");

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await;

        match result {
            Ok(deleted_count) => Ok(deleted_count > 0),
            Err(e) => {
                error!(key, error = %e, "Failed to delete key");
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Check if the Redis connection is healthy
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if healthy, error otherwise
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move {
                    redis::cmd("PING")
                        .query_async::<_, String>(&mut conn)
                        .await
                })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => {
                debug!("Redis health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!(response = %response, "Redis health check returned unexpected response");
                Ok(false)
            }
            Err(e) => {
                error!(error = %e, "Redis health check failed");
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Execute a Redis operation with exponential backoff on transient errors
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            let result = match self.connection().await {
                Ok(conn) => operation(conn).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(result) => return Ok(result),
                Err(e) if attempts < self.max_retries && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, self.max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn open_client(config: &CacheConfig) -> Result<Client, InfrastructureError> {
    Client::open(config.url.as_str()).map_err(|e| {
        error!(error = %e, "Failed to parse Redis URL");
        InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
    })
}

/// Whether a Redis error is worth retrying
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::IoError
            | ErrorKind::ClientError
            | ErrorKind::BusyLoadingError
            | ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
