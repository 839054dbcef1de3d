//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `auth` - Token signing and session state store configuration
//! - `cache` - Redis configuration
//! - `database` - Database connection and pool configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;

use std::path::Path;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{AuthConfig, JwtConfig, SessionStateConfig, StateBackend};
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Prefix for environment overrides when loading layered configuration
/// (`SG__AUTH__JWT__SECRET=...`)
pub const ENV_PREFIX: &str = "SG";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            auth: AuthConfig::for_environment(env),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: AuthConfig::for_environment(Environment::Development),
            database: DatabaseConfig::new("mysql://localhost:3306/sessionguard_dev"),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    ///
    /// The signing secret is intentionally left unset; it must come from the
    /// environment or a config file.
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            auth: AuthConfig::for_environment(Environment::Production),
            database: DatabaseConfig::new("mysql://prod-db:3306/sessionguard")
                .with_max_connections(50),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            auth: AuthConfig::from_env(environment),
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load layered configuration: defaults for the detected environment,
    /// then the optional config file, then `SG__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let environment = Environment::from_env();
        let defaults = match environment {
            Environment::Production => Self::production(),
            _ => {
                let mut config = Self::development();
                config.environment = environment;
                config.auth = AuthConfig::for_environment(environment);
                config.logging = LoggingConfig::for_environment(environment);
                config
            }
        };

        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&defaults)?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        } else {
            builder = builder
                .add_source(config::File::with_name(environment.config_file()).required(false));
        }

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Whether the session state store may degrade to process-local memory
    pub fn allows_memory_fallback(&self) -> bool {
        self.auth.session.allow_memory_fallback
    }
}
