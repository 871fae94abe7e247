//! Process-wide Prometheus-style metrics (§4.13). The `metrics` facade is
//! used here; installing a concrete recorder (e.g.
//! `metrics-exporter-prometheus`) and rendering `/metrics` is the HTTP
//! crate's job — this module only records observations.

use crate::model::ToolId;

const REQUESTS_TOTAL: &str = "router_requests_total";
const REQUEST_DURATION_MS: &str = "router_request_duration_ms";
const TOKENS_INPUT_TOTAL: &str = "router_tokens_input_total";
const TOKENS_OUTPUT_TOTAL: &str = "router_tokens_output_total";
const COST_USD_TOTAL: &str = "router_cost_usd_total";

/// `Counter::increment` only takes whole units, so USD cost is accumulated
/// in cents and rounded to the nearest cent per call; fractional-cent loss
/// is accepted rather than exposing `router_cost_usd_total` as a gauge.
const CENTS_PER_USD: f64 = 100.0;

/// Record one completed request's metrics.
pub fn record_request(tool: ToolId, duration_ms: u64, tokens_input: u32, tokens_output: u32, cost_usd: f64) {
    let tool_label = tool.to_string();
    metrics::counter!(REQUESTS_TOTAL, "tool" => tool_label).increment(1);
    metrics::histogram!(REQUEST_DURATION_MS).record(duration_ms as f64);

    if tokens_input > 0 {
        metrics::counter!(TOKENS_INPUT_TOTAL).increment(tokens_input as u64);
    }
    if tokens_output > 0 {
        metrics::counter!(TOKENS_OUTPUT_TOTAL).increment(tokens_output as u64);
    }
    if cost_usd > 0.0 {
        let cents = (cost_usd * CENTS_PER_USD).round() as u64;
        if cents > 0 {
            metrics::counter!(COST_USD_TOTAL).increment(cents);
        }
    }
}
