//! Per-identifier sliding-window rate limiter (§4.8). Prefers a Redis sorted
//! set for atomic cross-process counting; falls back to an in-process
//! mutex-guarded table when Redis is unavailable.

use crate::config::RateLimiterConfig;
use crate::error::RouterError;
use redis::aio::ConnectionManager;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

enum Backend {
    Redis(ConnectionManager),
    InProcess(Mutex<HashMap<String, VecDeque<Instant>>>),
}

/// Sliding-window rate limiter over an identifier (user id, API key, ...).
pub struct RateLimiter {
    backend: Backend,
    max_requests: u32,
    window: Duration,
    enabled: bool,
}

impl RateLimiter {
    pub async fn connect(config: &RateLimiterConfig) -> Self {
        let backend = match &config.redis_url {
            Some(url) => match redis::Client::open(url.as_str()) {
                Ok(client) => match client.get_connection_manager().await {
                    Ok(conn) => Backend::Redis(conn),
                    Err(_) => Backend::InProcess(Mutex::new(HashMap::new())),
                },
                Err(_) => Backend::InProcess(Mutex::new(HashMap::new())),
            },
            None => Backend::InProcess(Mutex::new(HashMap::new())),
        };

        Self {
            backend,
            max_requests: config.max_requests,
            window: config.window,
            enabled: true,
        }
    }

    /// A limiter that allows every request unconditionally.
    pub fn disabled() -> Self {
        Self {
            backend: Backend::InProcess(Mutex::new(HashMap::new())),
            max_requests: u32::MAX,
            window: Duration::from_secs(1),
            enabled: false,
        }
    }

    fn key(identifier: &str) -> String {
        format!("ratelimit:{identifier}")
    }

    /// Current count of requests within the window, without recording one.
    async fn count_in_window(&self, identifier: &str) -> u32 {
        if !self.enabled {
            return 0;
        }
        match &self.backend {
            Backend::InProcess(table) => {
                let mut guard = table.lock().unwrap();
                let now = Instant::now();
                let entry = guard.entry(identifier.to_string()).or_default();
                while let Some(&front) = entry.front() {
                    if now.duration_since(front) > self.window {
                        entry.pop_front();
                    } else {
                        break;
                    }
                }
                entry.len() as u32
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let key = Self::key(identifier);
                let now_ms = now_millis();
                let window_ms = self.window.as_millis() as i64;
                let _: redis::RedisResult<()> = redis::cmd("ZREMRANGEBYSCORE")
                    .arg(&key)
                    .arg(0)
                    .arg(now_ms - window_ms)
                    .query_async(&mut conn)
                    .await;
                redis::cmd("ZCARD")
                    .arg(&key)
                    .query_async(&mut conn)
                    .await
                    .unwrap_or(0)
            }
        }
    }

    /// `is_allowed(id) = count < max_requests`.
    pub async fn is_allowed(&self, identifier: &str) -> bool {
        if !self.enabled {
            return true;
        }
        self.count_in_window(identifier).await < self.max_requests
    }

    /// Record one request for `identifier`. Callers should only record
    /// requests that were permitted (§4.12 step 1).
    pub async fn record_request(&self, identifier: &str) {
        if !self.enabled {
            return;
        }
        match &self.backend {
            Backend::InProcess(table) => {
                let mut guard = table.lock().unwrap();
                guard
                    .entry(identifier.to_string())
                    .or_default()
                    .push_back(Instant::now());
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let key = Self::key(identifier);
                let now_ms = now_millis();
                let window_secs = self.window.as_secs().max(1);
                let _: redis::RedisResult<()> = redis::pipe()
                    .atomic()
                    .cmd("ZADD")
                    .arg(&key)
                    .arg(now_ms)
                    .arg(now_ms)
                    .cmd("EXPIRE")
                    .arg(&key)
                    .arg(window_secs)
                    .query_async(&mut conn)
                    .await;
            }
        }
    }

    /// `check_limit(id)`: raises `rate_limit` with `retry_after_seconds` when
    /// the identifier has exceeded its window.
    pub async fn check_limit(&self, identifier: &str) -> Result<(), RouterError> {
        if self.is_allowed(identifier).await {
            Ok(())
        } else {
            let retry_after = self.window.as_secs_f64();
            Err(RouterError::rate_limit(format!(
                "rate limit exceeded for {identifier}"
            ))
            .with_detail("identifier", identifier)
            .with_detail("limit", self.max_requests)
            .with_detail("window_seconds", self.window.as_secs())
            .with_detail("retry_after_seconds", retry_after))
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn in_process_limiter(max: u32, window: Duration) -> RateLimiter {
        RateLimiter {
            backend: Backend::InProcess(Mutex::new(HashMap::new())),
            max_requests: max,
            window,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn allows_up_to_max_requests() {
        let limiter = in_process_limiter(3, Duration::from_secs(60)).await;
        for _ in 0..3 {
            assert!(limiter.is_allowed("u1").await);
            limiter.record_request("u1").await;
        }
        assert!(!limiter.is_allowed("u1").await);
    }

    #[tokio::test]
    async fn check_limit_reports_retry_after() {
        let limiter = in_process_limiter(1, Duration::from_secs(60)).await;
        limiter.record_request("u1").await;
        let err = limiter.check_limit("u1").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::RateLimit);
        assert!(err.details.contains_key("retry_after_seconds"));
    }

    #[tokio::test]
    async fn disabled_limiter_allows_unconditionally() {
        let limiter = RateLimiter::disabled();
        for _ in 0..1000 {
            assert!(limiter.is_allowed("anyone").await);
        }
    }

    #[tokio::test]
    async fn independent_identifiers_have_independent_windows() {
        let limiter = in_process_limiter(1, Duration::from_secs(60)).await;
        limiter.record_request("u1").await;
        assert!(!limiter.is_allowed("u1").await);
        assert!(limiter.is_allowed("u2").await);
    }
}
