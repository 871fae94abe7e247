//! Hot plan cache over Redis (§4.6). Degrades to a no-op cache if the
//! backing store is unavailable at construction — every operation then
//! counts toward `misses`/`errors` without ever raising into the pipeline.

use crate::config::CacheConfig;
use crate::model::{hash_query, Plan};
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache statistics for monitoring (§4.6).
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub sets: AtomicU64,
    pub errors: AtomicU64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

impl CacheStatsSnapshot {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_requests() == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests() as f64
        }
    }
}

/// Hot, TTL'd key-value cache of validated plans, keyed by `sql:<hash>`.
pub struct PlanCache {
    conn: Option<ConnectionManager>,
    ttl_seconds: u64,
    max_cache_size_bytes: usize,
    stats: Arc<CacheStats>,
}

impl PlanCache {
    /// Attempt to connect; on any failure, degrade to a no-op cache (§4.6).
    pub async fn connect(config: &CacheConfig) -> Self {
        let conn = match &config.redis_url {
            Some(url) => match redis::Client::open(url.as_str()) {
                Ok(client) => client.get_connection_manager().await.ok(),
                Err(_) => None,
            },
            None => None,
        };

        Self {
            conn,
            ttl_seconds: config.ttl.as_secs(),
            max_cache_size_bytes: config.max_cache_size_bytes,
            stats: Arc::new(CacheStats::default()),
        }
    }

    fn key(query: &str) -> String {
        format!("sql:{}", hash_query(query))
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// `get(query) -> Plan | miss`. Corrupted entries are returned as a miss
    /// and counted as an error.
    pub async fn get(&self, query: &str) -> Option<Plan> {
        let mut conn = match &self.conn {
            Some(c) => c.clone(),
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let key = Self::key(query);
        let raw: Option<String> = match redis::cmd("GET").arg(&key).query_async(&mut conn).await {
            Ok(v) => v,
            Err(_) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match raw {
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(value) => match serde_json::from_str::<Plan>(&value) {
                Ok(plan) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    Some(plan)
                }
                Err(_) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
        }
    }

    /// `set(query, plan, bypass) -> stored?`. Oversized plans are skipped but
    /// still counted as a set attempt.
    pub async fn set(&self, query: &str, plan: &Plan, bypass: bool) -> bool {
        if bypass {
            return false;
        }
        let mut conn = match &self.conn {
            Some(c) => c.clone(),
            None => return false,
        };

        let value = match serde_json::to_string(plan) {
            Ok(v) => v,
            Err(_) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        self.stats.sets.fetch_add(1, Ordering::Relaxed);
        if value.len() > self.max_cache_size_bytes {
            return false;
        }

        let key = Self::key(query);
        let result: redis::RedisResult<()> = redis::cmd("SETEX")
            .arg(&key)
            .arg(self.ttl_seconds)
            .arg(&value)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => true,
            Err(_) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub async fn delete(&self, query: &str) -> bool {
        let mut conn = match &self.conn {
            Some(c) => c.clone(),
            None => return false,
        };
        let key = Self::key(query);
        redis::cmd("DEL")
            .arg(&key)
            .query_async::<_, ()>(&mut conn)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cache_is_always_a_miss() {
        let config = CacheConfig {
            redis_url: None,
            ttl: std::time::Duration::from_secs(60),
            max_cache_size_bytes: 1024,
        };
        let cache = PlanCache::connect(&config).await;
        assert!(!cache.is_enabled());
        assert!(cache.get("show revenue").await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn disabled_cache_set_reports_not_stored() {
        let config = CacheConfig {
            redis_url: None,
            ttl: std::time::Duration::from_secs(60),
            max_cache_size_bytes: 1024,
        };
        let cache = PlanCache::connect(&config).await;
        let plan = Plan {
            sql: "SELECT 1 FROM sales_fact LIMIT 10".into(),
            confidence: 0.9,
            explanation: "x".into(),
        };
        assert!(!cache.set("q", &plan, false).await);
    }
}
