//! Orchestrates cache → history → breaker → provider → schema (§4.10).

use crate::cache::PlanCache;
use crate::circuit_breaker::CircuitBreaker;
use crate::error::RouterError;
use crate::history::PlanHistory;
use crate::model::{Plan, Usage};
use crate::provider::LlmProvider;
use std::sync::Mutex;
use std::time::Duration;

const ALLOWED_TABLES_DESCRIPTION: &str = "sales_fact, job_runs, audit_log";

fn build_prompt(natural_language_query: &str) -> String {
    format!(
        "You translate natural-language analytics questions into a single read-only SQL SELECT statement.\n\
         Allowed tables: {ALLOWED_TABLES_DESCRIPTION}.\n\
         Rules: the statement must start with SELECT, must not contain any other statement, \
         and must include a LIMIT clause with a positive integer.\n\
         Natural language query: {natural_language_query}"
    )
}

/// Orchestrates the SQL planning pipeline (C10).
pub struct SqlPlanner {
    provider: Box<dyn LlmProvider>,
    breaker: CircuitBreaker,
    cache: PlanCache,
    history: PlanHistory,
    last_usage: Mutex<Usage>,
}

impl SqlPlanner {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        breaker: CircuitBreaker,
        cache: PlanCache,
        history: PlanHistory,
    ) -> Self {
        Self {
            provider,
            breaker,
            cache,
            history,
            last_usage: Mutex::new(Usage::zero()),
        }
    }

    /// Usage spent by the most recent `plan()` call (zero on cache/history hits).
    pub fn last_usage(&self) -> Usage {
        *self.last_usage.lock().unwrap()
    }

    pub async fn plan(
        &self,
        query: &str,
        timeout: Duration,
        bypass_cache: bool,
    ) -> Result<Plan, RouterError> {
        // 1. Cache probe.
        if !bypass_cache {
            if let Some(plan) = self.cache.get(query).await {
                *self.last_usage.lock().unwrap() = Usage::zero();
                return Ok(plan);
            }
        }

        // 2. History probe.
        if !bypass_cache {
            if let Ok(Some(entry)) = self.history.lookup(query).await {
                *self.last_usage.lock().unwrap() = Usage::zero();
                return Ok(Plan {
                    sql: entry.generated_sql,
                    confidence: entry.confidence,
                    explanation: "retrieved from plan history".to_string(),
                });
            }
        }

        // 3. Admission via breaker.
        if !self.breaker.can_execute() {
            return Err(RouterError::circuit_breaker(
                "LLM provider circuit breaker is open",
            )
            .with_detail("state", format!("{:?}", self.breaker.state()).to_lowercase()));
        }

        // 4. Provider call.
        let prompt = build_prompt(query);
        match self.provider.generate_plan(&prompt, timeout).await {
            Ok((plan, usage)) => {
                // 5. Success outcome.
                self.breaker.record_success();
                if !bypass_cache {
                    self.cache.set(query, &plan, false).await;
                }
                *self.last_usage.lock().unwrap() = usage;
                Ok(plan)
            }
            Err(err) => {
                self.breaker.record_failure();
                *self.last_usage.lock().unwrap() = Usage::zero();
                Err(err)
            }
        }
    }
}
