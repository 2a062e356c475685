//! Authentication configuration

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::auth::errors::AuthError;

/// Minimum accepted signing secret length
pub const MIN_SECRET_LEN: usize = 32;

/// Longest code whose numeric value still fits in a u64
pub const MAX_OTP_LENGTH: usize = 19;

/// Upper bound for the code lifetime and the rate limit window
pub const MAX_SHORT_LIVED: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound for the session token lifetime
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Backend used for OTP records and rate limit counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process maps (single instance only)
    Memory,
    /// Shared Redis instance with native key expiry
    Redis,
}

impl std::str::FromStr for StoreBackend {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(AuthError::Config(format!("unknown STORE_BACKEND '{}'", other))),
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// host:port
    pub addr: String,
    pub password: Option<SecretString>,
    pub database: u8,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            password: None,
            database: 0,
        }
    }
}

impl RedisSettings {
    /// Connection URL understood by the Redis client
    pub fn connection_url(&self) -> String {
        let auth = self
            .password
            .as_ref()
            .map(|p| format!(":{}@", p.expose_secret()))
            .unwrap_or_default();
        format!("redis://{}{}/{}", auth, self.addr, self.database)
    }
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token signing secret
    pub jwt_secret: SecretString,

    /// Number of digits per code
    pub otp_length: usize,

    /// Code lifetime
    pub otp_ttl: Duration,

    /// Issuance attempts allowed per window
    pub rate_limit_max: i64,

    /// Fixed window length
    pub rate_limit_window: Duration,

    /// Session token lifetime
    pub token_ttl: Duration,

    pub store_backend: StoreBackend,

    pub redis: RedisSettings,

    /// User directory database
    pub database_url: String,

    /// HTTP listen address
    pub bind_addr: String,

    /// Per-request deadline
    pub request_timeout: Duration,
}

impl AuthConfig {
    /// Config with every default and the given secret
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::new(secret.into()),
            otp_length: 6,
            otp_ttl: Duration::from_secs(120),
            rate_limit_max: 3,
            rate_limit_window: Duration::from_secs(10 * 60),
            token_ttl: Duration::from_secs(30 * 60),
            store_backend: StoreBackend::Memory,
            redis: RedisSettings::default(),
            database_url: "sqlite://./data/users.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET must be set".to_string()))?;

        let mut config = Self::with_secret(secret);

        if let Ok(len) = std::env::var("OTP_LENGTH") {
            config.otp_length = len
                .trim()
                .parse()
                .map_err(|_| AuthError::Config(format!("OTP_LENGTH '{}' is not a number", len)))?;
        }
        config.otp_ttl = env_secs("OTP_TTL_SECS").unwrap_or(config.otp_ttl);
        config.rate_limit_max = std::env::var("RATE_LIMIT_MAX")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(config.rate_limit_max);
        config.rate_limit_window =
            env_secs("RATE_LIMIT_WINDOW_SECS").unwrap_or(config.rate_limit_window);
        config.token_ttl = env_secs("TOKEN_TTL_SECS").unwrap_or(config.token_ttl);
        config.request_timeout =
            env_secs("REQUEST_TIMEOUT_SECS").unwrap_or(config.request_timeout);

        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            config.store_backend = backend.parse()?;
        }

        if let Ok(addr) = std::env::var("REDIS_ADDR") {
            config.redis.addr = addr;
        }
        config.redis.password = std::env::var("REDIS_PASS")
            .ok()
            .filter(|p| !p.is_empty())
            .map(SecretString::new);
        config.redis.database = std::env::var("REDIS_DB")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.validate()?;
        Ok(config)
    }

    /// Fail unless state lives in a store shared with the running server.
    ///
    /// One-shot operator commands run in their own process; against the in-process
    /// backend they would only touch their own empty maps.
    pub fn require_shared_store(&self, command: &str) -> Result<(), AuthError> {
        match self.store_backend {
            StoreBackend::Redis => Ok(()),
            StoreBackend::Memory => Err(AuthError::Config(format!(
                "{} requires STORE_BACKEND=redis",
                command
            ))),
        }
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        if self.otp_length == 0 || self.otp_length > MAX_OTP_LENGTH {
            return Err(AuthError::Config(format!(
                "OTP_LENGTH must be between 1 and {}",
                MAX_OTP_LENGTH
            )));
        }
        if self.rate_limit_max < 1 {
            return Err(AuthError::Config("RATE_LIMIT_MAX must be positive".to_string()));
        }
        if self.rate_limit_window.is_zero() {
            return Err(AuthError::Config(
                "RATE_LIMIT_WINDOW_SECS must be positive".to_string(),
            ));
        }
        if self.rate_limit_window > MAX_SHORT_LIVED {
            return Err(AuthError::Config(format!(
                "RATE_LIMIT_WINDOW_SECS must be at most {}",
                MAX_SHORT_LIVED.as_secs()
            )));
        }
        if self.otp_ttl > MAX_SHORT_LIVED {
            return Err(AuthError::Config(format!(
                "OTP_TTL_SECS must be at most {}",
                MAX_SHORT_LIVED.as_secs()
            )));
        }
        if self.token_ttl.is_zero() || self.token_ttl > MAX_TOKEN_TTL {
            return Err(AuthError::Config(format!(
                "TOKEN_TTL_SECS must be between 1 and {}",
                MAX_TOKEN_TTL.as_secs()
            )));
        }
        Ok(())
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
