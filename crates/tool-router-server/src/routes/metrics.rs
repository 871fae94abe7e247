//! Prometheus text-exposition endpoint (§4.13, §6).

use crate::state::AppState;
use axum::extract::State;

pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}
