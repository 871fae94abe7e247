//! Deterministic test double for [`LlmProvider`] (§4.2): configurable to
//! return a fixed plan, fail with a planning error, or simulate a timeout.

use super::LlmProvider;
use crate::error::RouterError;
use crate::model::{Plan, Usage};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// What a [`ScriptedProvider`] does on its next call.
#[derive(Debug, Clone)]
pub enum ScriptedBehavior {
    Succeed(Plan, Usage),
    Fail(String),
    Timeout,
}

/// A provider whose behavior is scripted ahead of time, one entry per call.
/// Once the script is exhausted, repeats the last entry.
pub struct ScriptedProvider {
    script: Mutex<Vec<ScriptedBehavior>>,
    calls: Mutex<u32>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ScriptedBehavior>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(0),
        }
    }

    /// A provider that always returns the same plan.
    pub fn fixed(plan: Plan, usage: Usage) -> Self {
        Self::new(vec![ScriptedBehavior::Succeed(plan, usage)])
    }

    /// A provider that always fails with a planning error.
    pub fn always_fails(message: impl Into<String>) -> Self {
        Self::new(vec![ScriptedBehavior::Fail(message.into())])
    }

    /// A provider that always times out.
    pub fn always_times_out() -> Self {
        Self::new(vec![ScriptedBehavior::Timeout])
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate_plan(
        &self,
        _prompt: &str,
        timeout: Duration,
    ) -> Result<(Plan, Usage), RouterError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let index = (*calls as usize).min(self.script.lock().unwrap().len().saturating_sub(1));
            *calls += 1;
            index
        };

        let behavior = self.script.lock().unwrap()[index].clone();
        match behavior {
            ScriptedBehavior::Succeed(plan, usage) => Ok((plan, usage)),
            ScriptedBehavior::Fail(message) => Err(RouterError::planning(message)),
            ScriptedBehavior::Timeout => {
                tokio::time::sleep(timeout + Duration::from_millis(1)).await;
                Err(RouterError::timeout("LLM provider call exceeded timeout"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_provider_always_succeeds() {
        let plan = Plan {
            sql: "SELECT 1 FROM sales_fact LIMIT 10".into(),
            confidence: 0.9,
            explanation: "x".into(),
        };
        let provider = ScriptedProvider::fixed(plan.clone(), Usage::zero());
        let (result, _) = provider
            .generate_plan("q", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result.sql, plan.sql);
    }

    #[tokio::test]
    async fn always_fails_returns_planning_error() {
        let provider = ScriptedProvider::always_fails("boom");
        let err = provider
            .generate_plan("q", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Planning);
    }
}
