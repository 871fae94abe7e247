pub mod health;
pub mod metrics;
pub mod query;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use query::query_handler;
