//! Shared application state handed to every axum handler.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tool_router_core::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics_handle: PrometheusHandle,
}
