//! Typed, layered configuration (§4.16, §6). Every component takes one of
//! these structs; nothing reads the environment by name outside this module.

use crate::error::RouterError;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, RouterError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| RouterError::configuration(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Cache tier configuration (§4.6).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub ttl: Duration,
    pub max_cache_size_bytes: usize,
}

impl CacheConfig {
    pub const DEFAULT_TTL_SECONDS: u64 = 1800;
    pub const DEFAULT_MAX_BYTES: usize = 1_048_576;

    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            redis_url: std::env::var("REDIS_URL").ok(),
            ttl: Duration::from_secs(env_or("CACHE_TTL_SECONDS", Self::DEFAULT_TTL_SECONDS)?),
            max_cache_size_bytes: env_or("CACHE_MAX_BYTES", Self::DEFAULT_MAX_BYTES)?,
        })
    }
}

/// Plan-history tier configuration (§4.7).
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub retention_days: i64,
}

impl HistoryConfig {
    pub const DEFAULT_RETENTION_DAYS: i64 = 30;

    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            retention_days: env_or("QUERY_RETENTION_DAYS", Self::DEFAULT_RETENTION_DAYS)?,
        })
    }
}

/// Rate limiter configuration (§4.8).
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub redis_url: Option<String>,
}

impl RateLimiterConfig {
    pub const DEFAULT_MAX_REQUESTS: u32 = 100;
    pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            max_requests: env_or("RATE_LIMIT_MAX", Self::DEFAULT_MAX_REQUESTS)?,
            window: Duration::from_secs(env_or(
                "RATE_LIMIT_WINDOW",
                Self::DEFAULT_WINDOW_SECONDS,
            )?),
            redis_url: std::env::var("REDIS_URL").ok(),
        })
    }
}

/// Circuit breaker configuration (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: usize,
    pub window: Duration,
    pub recovery_timeout: Duration,
}

impl CircuitBreakerSettings {
    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            failure_threshold: env_or("CB_FAILURE_THRESHOLD", 5usize)?,
            window: Duration::from_secs(env_or("CB_WINDOW", 60u64)?),
            recovery_timeout: Duration::from_secs(env_or("CB_RECOVERY", 30u64)?),
        })
    }
}

impl From<CircuitBreakerSettings> for crate::circuit_breaker::CircuitBreakerConfig {
    fn from(s: CircuitBreakerSettings) -> Self {
        crate::circuit_breaker::CircuitBreakerConfig {
            failure_threshold: s.failure_threshold,
            window: s.window,
            recovery_timeout: s.recovery_timeout,
        }
    }
}

/// LLM provider selection (§4.2, §6). Absence of `base_url`/`api_key`
/// degrades the SQL tool to raw-SQL-only.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            base_url: std::env::var("LLM_BASE_URL").ok(),
            api_key: std::env::var("LLM_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string()),
            request_timeout: Duration::from_secs(env_or(
                "LLM_TIMEOUT_SECONDS",
                Self::DEFAULT_TIMEOUT_SECONDS,
            )?),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }
}

/// Relational warehouse connection configuration (§6).
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env_or("DB_PORT", 5432u16)?,
            name: std::env::var("DB_NAME").unwrap_or_else(|_| "tool_router".to_string()),
            user: std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
        })
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

/// Aggregate configuration for the whole router core.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub cache: CacheConfig,
    pub history: HistoryConfig,
    pub rate_limiter: RateLimiterConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub provider: ProviderConfig,
    pub db: DbConfig,
    pub validator: crate::validator::ValidatorConfig,
    pub confidence_threshold: f64,
}

impl RouterConfig {
    pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

    pub fn from_env() -> Result<Self, RouterError> {
        Ok(Self {
            cache: CacheConfig::from_env()?,
            history: HistoryConfig::from_env()?,
            rate_limiter: RateLimiterConfig::from_env()?,
            circuit_breaker: CircuitBreakerSettings::from_env()?,
            provider: ProviderConfig::from_env()?,
            db: DbConfig::from_env()?,
            validator: crate::validator::ValidatorConfig::default(),
            confidence_threshold: env_or(
                "CONFIDENCE_THRESHOLD",
                Self::DEFAULT_CONFIDENCE_THRESHOLD,
            )?,
        })
    }
}
