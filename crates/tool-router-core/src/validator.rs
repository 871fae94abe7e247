//! Deterministic SQL validator — final authority over every SQL string that
//! reaches the database, whether it arrived as raw user input or was
//! generated by the LLM planner.

use crate::error::RouterError;
use regex::Regex;
use std::sync::OnceLock;

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TRUNCATE", "GRANT", "REVOKE", "COPY",
];

const DEFAULT_ALLOWED_TABLES: &[&str] = &["sales_fact", "job_runs", "audit_log"];
const DEFAULT_LIMIT: u32 = 200;

/// Configuration for the validator's table allow-list and default row cap.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub allowed_tables: Vec<String>,
    pub default_limit: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_tables: DEFAULT_ALLOWED_TABLES.iter().map(|s| s.to_string()).collect(),
            default_limit: DEFAULT_LIMIT,
        }
    }
}

fn word_regex(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).unwrap()
}

fn limit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)\b").unwrap())
}

fn from_join_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z_][A-Za-z0-9_.]*)").unwrap())
}

/// Validate and sanitize a SQL string. See §4.4: final authority over SQL.
///
/// Returns the sanitized SQL (with a default `LIMIT` appended if absent) or
/// a `validation` [`RouterError`].
pub fn validate(sql: &str, config: &ValidatorConfig) -> Result<String, RouterError> {
    let trimmed = sql.trim();

    if !trimmed.to_uppercase().starts_with("SELECT") {
        return Err(RouterError::validation("SQL must begin with SELECT"));
    }

    if trimmed.contains(';') {
        return Err(RouterError::validation(
            "SQL must not contain statement separators",
        ));
    }

    for keyword in FORBIDDEN_KEYWORDS {
        if word_regex(keyword).is_match(trimmed) {
            return Err(RouterError::validation(format!(
                "SQL contains forbidden keyword {keyword}"
            ))
            .with_detail("keyword", *keyword));
        }
    }

    for capture in from_join_regex().captures_iter(trimmed) {
        let table = capture[1].to_string();
        let bare = table.split('.').next_back().unwrap_or(&table);
        let allowed = config
            .allowed_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(bare));
        if !allowed {
            return Err(RouterError::validation(format!(
                "table {table} is not in the allow-list"
            ))
            .with_detail("table", table.clone()));
        }
    }

    if limit_regex().is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed} LIMIT {}", config.default_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ValidatorConfig {
        ValidatorConfig::default()
    }

    #[test]
    fn accepts_plain_select() {
        let sql = validate("SELECT region FROM sales_fact LIMIT 5", &cfg()).unwrap();
        assert_eq!(sql, "SELECT region FROM sales_fact LIMIT 5");
    }

    #[test]
    fn rejects_non_select() {
        assert!(validate("UPDATE sales_fact SET x = 1", &cfg()).is_err());
    }

    #[test]
    fn rejects_semicolon() {
        assert!(validate("SELECT 1 FROM sales_fact; DROP TABLE audit_log", &cfg()).is_err());
    }

    #[test]
    fn rejects_forbidden_keyword_in_body() {
        let sql = "SELECT * FROM sales_fact WHERE 1=1 OR DROP TABLE audit_log LIMIT 10";
        assert!(validate(sql, &cfg()).is_err());
    }

    #[test]
    fn rejects_table_not_in_allowlist() {
        assert!(validate("SELECT * FROM secret_table LIMIT 10", &cfg()).is_err());
    }

    #[test]
    fn appends_default_limit_when_missing() {
        let sql = validate("SELECT * FROM sales_fact", &cfg()).unwrap();
        assert_eq!(sql, "SELECT * FROM sales_fact LIMIT 200");
    }

    #[test]
    fn preserves_existing_limit() {
        let sql = validate("SELECT * FROM sales_fact LIMIT 7", &cfg()).unwrap();
        assert_eq!(sql, "SELECT * FROM sales_fact LIMIT 7");
    }

    #[test]
    fn allows_join_on_allowlisted_table() {
        let sql = "SELECT s.region FROM sales_fact s JOIN job_runs j ON j.id = s.job_id LIMIT 1";
        assert!(validate(sql, &cfg()).is_ok());
    }
}
