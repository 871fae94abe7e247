//! Warm, durable plan history over Postgres (§4.7). Upserts never overwrite
//! the validated SQL for a given query hash — only usage bookkeeping moves.

use crate::model::{hash_query, HistoryEntry};
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;

/// Plan history backed by the `query_history` table.
pub struct PlanHistory {
    pool: PgPool,
}

impl PlanHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a validated query. On conflict by `query_hash`, `generated_sql`
    /// is left untouched; only `last_used_at`, `use_count`, `expires_at` move.
    pub async fn store(
        &self,
        natural_language_query: &str,
        generated_sql: &str,
        confidence: f64,
        result_size_bytes: i64,
        row_count: i64,
        execution_time_ms: i64,
        tokens_input: i32,
        tokens_output: i32,
        cost_usd: f64,
        user_id: Option<&str>,
        correlation_id: Option<&str>,
        retention_days: i64,
    ) -> sqlx::Result<()> {
        let query_hash = hash_query(natural_language_query);
        let expires_at = Utc::now() + ChronoDuration::days(retention_days);

        sqlx::query(
            r#"
            INSERT INTO query_history (
                query_hash, natural_language_query, generated_sql,
                confidence, result_size_bytes, row_count,
                execution_time_ms, tokens_input, tokens_output,
                cost_usd, user_id, correlation_id,
                created_at, last_used_at, use_count, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    now(), now(), 1, $13)
            ON CONFLICT (query_hash) DO UPDATE SET
                last_used_at = now(),
                use_count = query_history.use_count + 1,
                expires_at = $13
            "#,
        )
        .bind(&query_hash)
        .bind(natural_language_query)
        .bind(generated_sql)
        .bind(confidence)
        .bind(result_size_bytes)
        .bind(row_count)
        .bind(execution_time_ms)
        .bind(tokens_input)
        .bind(tokens_output)
        .bind(cost_usd)
        .bind(user_id)
        .bind(correlation_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a query by its natural-language text. Only returns rows whose
    /// retention has not yet expired.
    pub async fn lookup(&self, natural_language_query: &str) -> sqlx::Result<Option<HistoryEntry>> {
        let query_hash = hash_query(natural_language_query);
        self.get_by_hash(&query_hash).await
    }

    pub async fn get_by_hash(&self, query_hash: &str) -> sqlx::Result<Option<HistoryEntry>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT query_hash, natural_language_query, generated_sql, confidence,
                   result_size_bytes, row_count, execution_time_ms,
                   tokens_input, tokens_output, cost_usd, user_id, correlation_id,
                   created_at, last_used_at, use_count, expires_at
            FROM query_history
            WHERE query_hash = $1 AND expires_at > now()
            "#,
        )
        .bind(query_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Delete rows past their retention period. Returns the number deleted.
    pub async fn cleanup(&self) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM query_history WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    query_hash: String,
    natural_language_query: String,
    generated_sql: String,
    confidence: f64,
    result_size_bytes: i64,
    row_count: i64,
    execution_time_ms: i64,
    tokens_input: i32,
    tokens_output: i32,
    cost_usd: f64,
    user_id: Option<String>,
    correlation_id: Option<String>,
    created_at: chrono::DateTime<Utc>,
    last_used_at: chrono::DateTime<Utc>,
    use_count: i64,
    expires_at: chrono::DateTime<Utc>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            query_hash: row.query_hash,
            natural_language_query: row.natural_language_query,
            generated_sql: row.generated_sql,
            confidence: row.confidence,
            result_size_bytes: row.result_size_bytes,
            row_count: row.row_count,
            execution_time_ms: row.execution_time_ms,
            tokens_input: row.tokens_input,
            tokens_output: row.tokens_output,
            cost_usd: row.cost_usd,
            user_id: row.user_id,
            correlation_id: row.correlation_id,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            use_count: row.use_count,
            expires_at: row.expires_at,
        }
    }
}
