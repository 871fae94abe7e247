//! Distinguishes raw vs. natural-language SQL queries, drives the planner
//! and validator, and executes the sanitized SELECT (§4.11).

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::model::{Usage, ToolResult};
use crate::sql_planner::SqlPlanner;
use crate::validator::{validate, ValidatorConfig};
use sqlx::{Column, PgPool, Row};
use std::time::Duration;

const RAW_SQL_PREFIXES: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "GRANT",
    "REVOKE", "WITH", "COPY",
];

/// SQL tool (C11): raw/NL detection, planner orchestration, validation,
/// execution.
pub struct SqlTool {
    pool: PgPool,
    planner: Option<SqlPlanner>,
    validator_config: ValidatorConfig,
    confidence_threshold: f64,
}

impl SqlTool {
    pub fn new(pool: PgPool, planner: Option<SqlPlanner>, config: &RouterConfig) -> Self {
        Self {
            pool,
            planner,
            validator_config: config.validator.clone(),
            confidence_threshold: config.confidence_threshold,
        }
    }

    fn is_raw_sql(query: &str) -> bool {
        let folded = query.trim().to_uppercase();
        RAW_SQL_PREFIXES.iter().any(|p| folded.starts_with(p))
    }

    fn error_result(error: &RouterError, notes: &str) -> ToolResult {
        ToolResult {
            data: serde_json::to_value(error.serialize()).unwrap_or(serde_json::Value::Null),
            notes: Some(notes.to_string()),
            tokens_input: 0,
            tokens_output: 0,
            cost_usd: 0.0,
        }
    }

    pub async fn run(&self, query: &str, _correlation_id: &str, bypass_cache: bool) -> ToolResult {
        if Self::is_raw_sql(query) {
            return match validate(query, &self.validator_config) {
                Ok(sql) => self.execute(&sql, Usage::zero()).await,
                Err(err) => Self::error_result(&err, "safety_violation"),
            };
        }

        let planner = match &self.planner {
            Some(p) => p,
            None => {
                let err = RouterError::configuration("no LLM provider configured for natural-language queries");
                return Self::error_result(&err, "configuration_error");
            }
        };

        let plan = match planner.plan(query, Duration::from_secs(30), bypass_cache).await {
            Ok(plan) => plan,
            Err(err) => return Self::error_result(&err, "planner_error"),
        };
        let usage = planner.last_usage();

        if plan.confidence < self.confidence_threshold {
            let err = RouterError::validation("planner confidence below threshold")
                .with_detail("suggested_sql", plan.sql.clone())
                .with_detail("explanation", plan.explanation.clone())
                .with_detail("confidence", plan.confidence);
            return Self::error_result(&err, "low_confidence");
        }

        match validate(&plan.sql, &self.validator_config) {
            Ok(sql) => self.execute(&sql, usage).await,
            Err(err) => Self::error_result(&err, "planner_validation_failed"),
        }
    }

    async fn execute(&self, sql: &str, usage: Usage) -> ToolResult {
        match sqlx::query(sql).fetch_all(&self.pool).await {
            Ok(rows) => {
                let columns: Vec<String> = rows
                    .first()
                    .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
                    .unwrap_or_default();
                let materialized: Vec<serde_json::Value> = rows.iter().map(row_to_json).collect();
                let data = serde_json::json!({
                    "columns": columns,
                    "rows": materialized,
                    "row_count": rows.len(),
                });
                ToolResult {
                    data,
                    notes: None,
                    tokens_input: usage.input_tokens,
                    tokens_output: usage.output_tokens,
                    cost_usd: usage.estimated_cost_usd,
                }
            }
            Err(e) => {
                let err = RouterError::execution(format!("query execution failed: {e}"));
                Self::error_result(&err, "execution_error")
            }
        }
    }
}

/// Materialize one row into a JSON array, converting fixed-precision
/// numerics (Postgres `NUMERIC`) to IEEE-754 doubles (§4.11).
fn row_to_json(row: &sqlx::postgres::PgRow) -> serde_json::Value {
    use sqlx::postgres::PgRow;
    use sqlx::TypeInfo;
    use sqlx::ValueRef;

    fn cell(row: &PgRow, idx: usize) -> serde_json::Value {
        let raw = row.try_get_raw(idx).ok();
        let type_name = raw
            .as_ref()
            .map(|v| v.type_info().name().to_string())
            .unwrap_or_default();

        if raw.as_ref().map(|v| v.is_null()).unwrap_or(true) {
            return serde_json::Value::Null;
        }

        match type_name.as_str() {
            "INT2" => row.try_get::<i16, _>(idx).map(|v| v.into()).unwrap_or(serde_json::Value::Null),
            "INT4" => row.try_get::<i32, _>(idx).map(|v| v.into()).unwrap_or(serde_json::Value::Null),
            "INT8" => row.try_get::<i64, _>(idx).map(|v| v.into()).unwrap_or(serde_json::Value::Null),
            "FLOAT4" => row
                .try_get::<f32, _>(idx)
                .map(|v| serde_json::json!(v as f64))
                .unwrap_or(serde_json::Value::Null),
            "FLOAT8" => row.try_get::<f64, _>(idx).map(|v| serde_json::json!(v)).unwrap_or(serde_json::Value::Null),
            "NUMERIC" => row
                .try_get::<rust_decimal::Decimal, _>(idx)
                .ok()
                .and_then(|d| {
                    use rust_decimal::prelude::ToPrimitive;
                    d.to_f64()
                })
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "BOOL" => row.try_get::<bool, _>(idx).map(|v| v.into()).unwrap_or(serde_json::Value::Null),
            "TIMESTAMP" | "TIMESTAMPTZ" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
                .map(|v| serde_json::Value::String(v.to_rfc3339()))
                .unwrap_or(serde_json::Value::Null),
            "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(idx).unwrap_or(serde_json::Value::Null),
            _ => row
                .try_get::<String, _>(idx)
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    let values: Vec<serde_json::Value> = (0..row.columns().len()).map(|i| cell(row, i)).collect();
    serde_json::Value::Array(values)
}
