//! Error taxonomy shared by every component in the pipeline.
//!
//! Every fallible operation below the HTTP boundary returns a [`RouterError`]
//! rather than `anyhow::Error` so failures stay within a closed, serializable
//! set. `anyhow` is reserved for process-startup wiring in the binary crate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The closed set of error kinds produced anywhere in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Planning,
    Validation,
    Execution,
    Timeout,
    RateLimit,
    CircuitBreaker,
    Cache,
    Configuration,
    Unknown,
}

/// Severity assigned to an error kind by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorKind {
    /// Fixed default severity for this kind.
    pub fn default_severity(self) -> Severity {
        match self {
            ErrorKind::Configuration => Severity::Critical,
            ErrorKind::Cache => Severity::Info,
            ErrorKind::Timeout | ErrorKind::RateLimit | ErrorKind::CircuitBreaker => {
                Severity::Warning
            }
            ErrorKind::Validation => Severity::Error,
            ErrorKind::Planning | ErrorKind::Execution => Severity::Error,
            ErrorKind::Unknown => Severity::Error,
        }
    }

    /// Fixed default retryability for this kind.
    pub fn default_retryable(self) -> bool {
        match self {
            ErrorKind::Configuration => false,
            ErrorKind::Cache => true,
            ErrorKind::Timeout | ErrorKind::RateLimit | ErrorKind::CircuitBreaker => true,
            ErrorKind::Validation => false,
            ErrorKind::Planning | ErrorKind::Execution => true,
            ErrorKind::Unknown => false,
        }
    }
}

/// A tagged error value carried through the pipeline.
///
/// `message` is a short human-readable summary; `details` carries structured
/// context (offending field names, breaker state, retry-after seconds, ...).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RouterError {
    pub kind: ErrorKind,
    pub message: String,
    pub severity: Severity,
    pub retryable: bool,
    pub details: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl RouterError {
    /// Construct an error using the fixed default severity/retryability for `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            retryable: kind.default_retryable(),
            message: message.into(),
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a structured detail field, builder-style.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn planning(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Planning, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn circuit_breaker(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CircuitBreaker, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Serialize into the stable seven-key shape (P3): every key always present.
    pub fn serialize(&self) -> SerializedError {
        SerializedError {
            error_type: format!("{:?}", self.kind).to_lowercase(),
            message: self.message.clone(),
            category: self.kind,
            severity: self.severity,
            retryable: self.retryable,
            details: self.details.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// The stable, seven-key serialized shape of a [`RouterError`].
#[derive(Debug, Clone, Serialize)]
pub struct SerializedError {
    pub error_type: String,
    pub message: String,
    pub category: ErrorKind,
    pub severity: Severity,
    pub retryable: bool,
    pub details: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_taxonomy() {
        assert_eq!(
            ErrorKind::Configuration.default_severity(),
            Severity::Critical
        );
        assert!(!ErrorKind::Configuration.default_retryable());
        assert_eq!(ErrorKind::Cache.default_severity(), Severity::Info);
        assert!(ErrorKind::Cache.default_retryable());
        assert_eq!(ErrorKind::Validation.default_severity(), Severity::Error);
        assert!(!ErrorKind::Validation.default_retryable());
    }

    #[test]
    fn serialize_has_exactly_seven_keys() {
        let err = RouterError::validation("bad shape").with_detail("field", "sql");
        let json = serde_json::to_value(err.serialize()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 7);
        for key in [
            "error_type",
            "message",
            "category",
            "severity",
            "retryable",
            "details",
            "timestamp",
        ] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
    }
}
