//! Machine-checkable shape of LLM planner output (§4.3).

use crate::error::RouterError;
use crate::model::Plan;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Raw shape an LLM response is deserialized into before validation.
#[derive(Debug, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
}

fn limit_with_positive_integer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\s+([1-9][0-9]*)\b").unwrap())
}

/// Validate a raw LLM response against the planner schema. On any violation,
/// returns a `validation` error carrying the offending field names.
pub fn validate_plan(raw: RawPlan) -> Result<Plan, RouterError> {
    let mut offending = Vec::new();

    let sql = match &raw.sql {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => {
            offending.push("sql");
            String::new()
        }
    };

    let confidence = match raw.confidence {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        _ => {
            offending.push("confidence");
            0.0
        }
    };

    let explanation = match &raw.explanation {
        Some(e) if !e.trim().is_empty() => e.clone(),
        _ => {
            offending.push("explanation");
            String::new()
        }
    };

    if !sql.is_empty() && !limit_with_positive_integer().is_match(&sql) {
        offending.push("sql");
    }

    if !offending.is_empty() {
        offending.sort();
        offending.dedup();
        return Err(RouterError::validation(
            "planner output failed schema validation",
        )
        .with_detail("offending_fields", offending.join(",")));
    }

    Ok(Plan {
        sql,
        confidence,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_plan() {
        let raw = RawPlan {
            sql: Some("SELECT 1 FROM sales_fact LIMIT 10".into()),
            confidence: Some(0.9),
            explanation: Some("because".into()),
        };
        let plan = validate_plan(raw).unwrap();
        assert_eq!(plan.confidence, 0.9);
    }

    #[test]
    fn rejects_missing_limit() {
        let raw = RawPlan {
            sql: Some("SELECT 1 FROM sales_fact".into()),
            confidence: Some(0.9),
            explanation: Some("because".into()),
        };
        assert!(validate_plan(raw).is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let raw = RawPlan {
            sql: Some("SELECT 1 FROM sales_fact LIMIT 10".into()),
            confidence: Some(1.5),
            explanation: Some("because".into()),
        };
        assert!(validate_plan(raw).is_err());
    }

    #[test]
    fn rejects_zero_limit() {
        let raw = RawPlan {
            sql: Some("SELECT 1 FROM sales_fact LIMIT 0".into()),
            confidence: Some(0.9),
            explanation: Some("because".into()),
        };
        assert!(validate_plan(raw).is_err());
    }
}
