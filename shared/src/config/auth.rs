//! Token signing and session state store configuration

use serde::{Deserialize, Serialize};

use super::environment::Environment;

/// Development-only signing secret; production never falls back to it
const DEVELOPMENT_SECRET: &str = "development-secret-please-change-in-production";

/// JWT signing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Shared secret for HMAC signing. `None` means "not configured", which is
    /// a fatal startup error for the token codec.
    #[serde(default)]
    pub secret: Option<String>,

    /// Algorithm for JWT signing (HS256, HS384 or HS512)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds for regular sessions
    pub refresh_token_expiry: i64,

    /// Refresh token expiry time in seconds when "remember me" was requested
    pub remember_refresh_token_expiry: i64,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: default_algorithm(),
            access_token_expiry: 900,                 // 15 minutes
            refresh_token_expiry: 86_400,             // 1 day
            remember_refresh_token_expiry: 2_592_000, // 30 days
            issuer: String::from("sessionguard"),
            audience: String::from("sessionguard-api"),
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set regular refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86_400;
        self
    }

    /// Set "remember me" refresh token expiry in days
    pub fn with_remember_expiry_days(mut self, days: i64) -> Self {
        self.remember_refresh_token_expiry = days * 86_400;
        self
    }

    /// Check if using the development secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret.as_deref() == Some(DEVELOPMENT_SECRET)
    }

    /// Refresh expiry in seconds for the given remember flag
    pub fn refresh_expiry_for(&self, remember: bool) -> i64 {
        if remember {
            self.remember_refresh_token_expiry
        } else {
            self.refresh_token_expiry
        }
    }
}

/// Which durable backend holds revocation and grace state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    Mysql,
    Redis,
    /// No durable store; only valid together with `allow_memory_fallback`
    Memory,
}

impl Default for StateBackend {
    fn default() -> Self {
        StateBackend::Mysql
    }
}

impl std::str::FromStr for StateBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(StateBackend::Mysql),
            "redis" => Ok(StateBackend::Redis),
            "memory" | "none" => Ok(StateBackend::Memory),
            _ => Err(format!("Invalid state backend: {}", s)),
        }
    }
}

/// Revocation / grace state store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionStateConfig {
    /// How long (ms) a just-rotated refresh token may be replayed to receive
    /// the same token pair. 0 disables the grace window.
    pub refresh_grace_ms: u64,

    /// Permit degrading to the process-local memory store when the durable
    /// store is unavailable
    pub allow_memory_fallback: bool,

    /// Upper bound (ms) for every durable store call
    pub store_timeout_ms: u64,

    /// Hard cap on entries per state class in the memory store
    pub memory_max_entries: usize,

    /// Interval for the background sweeper (0 = rely on opportunistic sweeps)
    #[serde(default)]
    pub sweep_interval_seconds: u64,

    /// Durable backend selection
    #[serde(default)]
    pub backend: StateBackend,
}

impl Default for SessionStateConfig {
    fn default() -> Self {
        Self {
            refresh_grace_ms: 10_000,
            allow_memory_fallback: false,
            store_timeout_ms: 2_000,
            memory_max_entries: 10_000,
            sweep_interval_seconds: 0,
            backend: StateBackend::default(),
        }
    }
}

impl SessionStateConfig {
    /// Defaults for an environment: only non-production may degrade to memory
    pub fn for_environment(env: Environment) -> Self {
        Self {
            allow_memory_fallback: !env.is_production(),
            ..Default::default()
        }
    }

    /// Set the grace window in milliseconds
    pub fn with_grace_ms(mut self, grace_ms: u64) -> Self {
        self.refresh_grace_ms = grace_ms;
        self
    }

    /// Set whether the memory fallback is permitted
    pub fn with_memory_fallback(mut self, allow: bool) -> Self {
        self.allow_memory_fallback = allow;
        self
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Session state store configuration
    #[serde(default)]
    pub session: SessionStateConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl AuthConfig {
    /// Defaults for an environment
    pub fn for_environment(env: Environment) -> Self {
        let jwt = if env.is_production() {
            JwtConfig::default()
        } else {
            JwtConfig::new(DEVELOPMENT_SECRET)
        };

        Self {
            jwt,
            session: SessionStateConfig::for_environment(env),
        }
    }

    /// Create from environment variables
    pub fn from_env(env: Environment) -> Self {
        let defaults = Self::for_environment(env);

        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or(defaults.jwt.secret);

        Self {
            jwt: JwtConfig {
                secret,
                algorithm: std::env::var("JWT_ALGORITHM").unwrap_or(defaults.jwt.algorithm),
                access_token_expiry: env_or(
                    "JWT_ACCESS_TOKEN_EXPIRY",
                    defaults.jwt.access_token_expiry,
                ),
                refresh_token_expiry: env_or(
                    "JWT_REFRESH_TOKEN_EXPIRY",
                    defaults.jwt.refresh_token_expiry,
                ),
                remember_refresh_token_expiry: env_or(
                    "JWT_REMEMBER_REFRESH_TOKEN_EXPIRY",
                    defaults.jwt.remember_refresh_token_expiry,
                ),
                issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
                audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt.audience),
            },
            session: SessionStateConfig {
                refresh_grace_ms: env_or("REFRESH_GRACE_MS", defaults.session.refresh_grace_ms),
                allow_memory_fallback: env_or(
                    "ALLOW_MEMORY_FALLBACK",
                    defaults.session.allow_memory_fallback,
                ),
                store_timeout_ms: env_or(
                    "STATE_STORE_TIMEOUT_MS",
                    defaults.session.store_timeout_ms,
                ),
                memory_max_entries: env_or(
                    "STATE_MEMORY_MAX_ENTRIES",
                    defaults.session.memory_max_entries,
                ),
                sweep_interval_seconds: env_or(
                    "STATE_SWEEP_INTERVAL_SECONDS",
                    defaults.session.sweep_interval_seconds,
                ),
                backend: env_or("STATE_BACKEND", defaults.session.backend),
            },
        }
    }

    /// Get JWT secret if configured
    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt.secret.as_deref()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_algorithm() -> String {
    String::from("HS256")
}
