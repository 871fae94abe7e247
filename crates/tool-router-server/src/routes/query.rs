//! `POST /query` (§6): the one request/response contract the gateway exposes
//! over the dispatcher.

use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tool_router_core::ToolId;

const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub bypass_cache: bool,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub tool_used: ToolId,
    pub confidence: f64,
    pub result: serde_json::Value,
    pub trace_id: String,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn query_length_in_bounds(query: &str) -> bool {
    let len = query.chars().count();
    (1..=4000).contains(&len)
}

pub async fn query_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> Response {
    if !query_length_in_bounds(&request.query) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "query must be 1..4000 characters",
            })),
        )
            .into_response();
    }

    let correlation_id = headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let envelope = state
        .dispatcher
        .handle(
            &request.query,
            correlation_id,
            request.user_id.as_deref(),
            request.bypass_cache,
        )
        .await;

    let mut response = Json(QueryResponse {
        tool_used: envelope.tool,
        confidence: envelope.confidence,
        result: envelope.result.data,
        trace_id: envelope.trace_id.clone(),
        cost_usd: envelope.result.cost_usd,
        notes: envelope.result.notes,
    })
    .into_response();

    if let Ok(value) = HeaderValue::from_str(&envelope.trace_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_query() {
        assert!(!query_length_in_bounds(""));
    }

    #[test]
    fn rejects_query_over_4000_chars() {
        let query = "a".repeat(4001);
        assert!(!query_length_in_bounds(&query));
    }

    #[test]
    fn accepts_query_in_bounds() {
        assert!(query_length_in_bounds("show revenue by region"));
        assert!(query_length_in_bounds(&"a".repeat(4000)));
    }
}
