//! Append-only audit sink over Postgres (§4.9). Write failures are logged
//! and swallowed — they must never affect the request path.

use crate::model::{hash_canonical_json, AuditRecord};
use chrono::Utc;
use sqlx::PgPool;

pub struct AuditSink {
    pool: PgPool,
}

/// Optional filters for querying the audit log (§4.9 read path).
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub correlation_id: Option<String>,
    pub tool: Option<String>,
    pub since: Option<chrono::DateTime<Utc>>,
    pub limit: i64,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }
}

impl AuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write one audit record. Errors are logged via `tracing` and
    /// swallowed — the caller's request path is never affected.
    pub async fn write(
        &self,
        correlation_id: &str,
        user_id: Option<&str>,
        tool: &str,
        action: &str,
        input: &serde_json::Value,
        output: &serde_json::Value,
        success: bool,
        duration_ms: i64,
        tokens_input: i32,
        tokens_output: i32,
        cost_usd: f64,
    ) {
        let input_hash = hash_canonical_json(input);
        let output_hash = hash_canonical_json(output);

        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (
                timestamp, correlation_id, user_id, tool, action,
                input_hash, output_hash, success, duration_ms,
                tokens_input, tokens_output, cost_usd
            )
            VALUES (now(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(correlation_id)
        .bind(user_id)
        .bind(tool)
        .bind(action)
        .bind(&input_hash)
        .bind(&output_hash)
        .bind(success)
        .bind(duration_ms)
        .bind(tokens_input)
        .bind(tokens_output)
        .bind(cost_usd)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            tracing::error!(correlation_id, error = %err, "failed to write audit record");
        }
    }

    /// Read path: append-only does not mean unreadable, only unmutable.
    pub async fn audit_records(&self, filter: &AuditFilter) -> sqlx::Result<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, timestamp, correlation_id, user_id, tool, action,
                   input_hash, output_hash, success, duration_ms,
                   tokens_input, tokens_output, cost_usd
            FROM audit_log
            WHERE ($1::text IS NULL OR correlation_id = $1)
              AND ($2::text IS NULL OR tool = $2)
              AND ($3::timestamptz IS NULL OR timestamp >= $3)
            ORDER BY timestamp DESC
            LIMIT $4
            "#,
        )
        .bind(&filter.correlation_id)
        .bind(&filter.tool)
        .bind(filter.since)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    timestamp: chrono::DateTime<Utc>,
    correlation_id: String,
    user_id: Option<String>,
    tool: String,
    action: String,
    input_hash: String,
    output_hash: String,
    success: bool,
    duration_ms: i64,
    tokens_input: i32,
    tokens_output: i32,
    cost_usd: f64,
}

impl From<AuditRow> for AuditRecord {
    fn from(row: AuditRow) -> Self {
        AuditRecord {
            id: row.id,
            timestamp: row.timestamp,
            correlation_id: row.correlation_id,
            user_id: row.user_id,
            tool: row.tool,
            action: row.action,
            input_hash: row.input_hash,
            output_hash: row.output_hash,
            success: row.success,
            duration_ms: row.duration_ms,
            tokens_input: row.tokens_input,
            tokens_output: row.tokens_output,
            cost_usd: row.cost_usd,
        }
    }
}
