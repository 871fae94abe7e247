//! Sliding-window circuit breaker guarding the LLM provider.
//!
//! Unlike a per-model registry, the router has exactly one upstream
//! dependency worth breaking on — the configured LLM provider — so this is a
//! single three-state machine, not a `HashMap` keyed by model.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Observable state of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Parameters controlling the breaker (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub window: Duration,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Inner {
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    half_open: bool,
}

/// Three-state sliding-window circuit breaker (§4.5). Thread-safe: all
/// transitions happen under a single mutex, so concurrent observers never
/// see a torn state.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                failures: VecDeque::new(),
                opened_at: None,
                half_open: false,
            }),
        }
    }

    /// Whether a call is currently permitted.
    pub fn can_execute(&self) -> bool {
        self.state() != CircuitState::Open
    }

    /// Current state, lazily transitioning OPEN → HALF_OPEN when the
    /// recovery timeout has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut guard = self.inner.lock().unwrap();
        match guard.opened_at {
            None => CircuitState::Closed,
            Some(opened_at) => {
                if guard.half_open {
                    CircuitState::HalfOpen
                } else if opened_at.elapsed() >= self.config.recovery_timeout {
                    guard.half_open = true;
                    CircuitState::HalfOpen
                } else {
                    CircuitState::Open
                }
            }
        }
    }

    /// Record a successful call. In HALF_OPEN this closes the circuit; in
    /// CLOSED it is a no-op.
    pub fn record_success(&self) {
        let mut guard = self.inner.lock().unwrap();
        if guard.half_open || guard.opened_at.is_some() {
            guard.failures.clear();
            guard.opened_at = None;
            guard.half_open = false;
        }
    }

    /// Record a failed call. Drops failures older than `window`, and opens
    /// the circuit once the threshold is reached. Any failure while
    /// HALF_OPEN immediately re-opens the circuit.
    pub fn record_failure(&self) {
        let mut guard = self.inner.lock().unwrap();
        let now = Instant::now();

        if guard.half_open {
            guard.failures.clear();
            guard.failures.push_back(now);
            guard.opened_at = Some(now);
            guard.half_open = false;
            return;
        }

        guard.failures.push_back(now);
        let window = self.config.window;
        while let Some(&front) = guard.failures.front() {
            if now.duration_since(front) > window {
                guard.failures.pop_front();
            } else {
                break;
            }
        }

        if guard.opened_at.is_none() && guard.failures.len() >= self.config.failure_threshold {
            guard.opened_at = Some(now);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::default();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_execute());
    }

    #[test]
    fn opens_after_threshold() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            window: Duration::from_secs(60),
            recovery_timeout: Duration::from_secs(9999),
        });
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());
    }

    #[test]
    fn threshold_minus_one_stays_closed() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            window: Duration::from_secs(60),
            recovery_timeout: Duration::from_secs(9999),
        });
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_from_half_open() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            window: Duration::from_secs(60),
            recovery_timeout: Duration::from_millis(50),
        });
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn failure_in_half_open_reopens() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            window: Duration::from_secs(60),
            recovery_timeout: Duration::from_millis(50),
        });
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
