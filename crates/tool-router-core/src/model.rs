//! Core data model shared across the pipeline (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which downstream tool a query was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    Sql,
    Vector,
    Rest,
    Unknown,
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolId::Sql => "sql",
            ToolId::Vector => "vector",
            ToolId::Rest => "rest",
            ToolId::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// An LLM-proposed, schema-valid SQL plan. Never mutated once created (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub sql: String,
    pub confidence: f64,
    pub explanation: String,
}

/// Token/cost accounting attached to each provider call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub estimated_cost_usd: f64,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// A plan-cache or plan-history entry, plus the usage spent producing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub plan: Plan,
    pub usage: Usage,
}

/// Output of invoking a tool's `run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub data: serde_json::Value,
    pub notes: Option<String>,
    pub tokens_input: u32,
    pub tokens_output: u32,
    pub cost_usd: f64,
}

/// The envelope returned by the dispatcher for one request (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedEnvelope {
    pub tool: ToolId,
    pub confidence: f64,
    pub result: ToolResult,
    pub elapsed_ms: u64,
    pub trace_id: String,
}

/// A durable plan-history row (§3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query_hash: String,
    pub natural_language_query: String,
    pub generated_sql: String,
    pub confidence: f64,
    pub result_size_bytes: i64,
    pub row_count: i64,
    pub execution_time_ms: i64,
    pub tokens_input: i32,
    pub tokens_output: i32,
    pub cost_usd: f64,
    pub user_id: Option<String>,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub use_count: i64,
    pub expires_at: DateTime<Utc>,
}

/// An append-only audit row (§3, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub user_id: Option<String>,
    pub tool: String,
    pub action: String,
    pub input_hash: String,
    pub output_hash: String,
    pub success: bool,
    pub duration_ms: i64,
    pub tokens_input: i32,
    pub tokens_output: i32,
    pub cost_usd: f64,
}

/// Normalize a query the way every hashing/cache-keying operation must (L1):
/// lowercase, then trim.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// SHA-256 hex digest of the normalized query, shared by the cache key and
/// the history table key so both tiers agree on identity (I4).
pub fn hash_query(query: &str) -> String {
    use sha2::{Digest, Sha256};
    let normalized = normalize_query(query);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest over canonical JSON (sorted keys) of a value (§4.9).
pub fn hash_canonical_json(value: &serde_json::Value) -> String {
    use sha2::{Digest, Sha256};
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", serde_json::to_string(k).unwrap(), canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_case_and_whitespace_insensitive() {
        assert_eq!(
            hash_query("  Show Revenue  "),
            hash_query("show revenue")
        );
    }

    #[test]
    fn canonical_hash_is_order_independent() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(hash_canonical_json(&a), hash_canonical_json(&b));
    }
}
