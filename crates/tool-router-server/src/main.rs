//! Enterprise tool router HTTP gateway (§4.15, §6).
//!
//! Boots the router core's components from environment configuration, wires
//! them into a [`Dispatcher`], and exposes `GET /health`, `GET /metrics`, and
//! `POST /query` over axum. Run with `--cleanup-history` to purge expired
//! plan-history rows and exit instead of serving traffic (§6 Maintenance).

mod config;
mod middleware;
mod routes;
mod state;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tool_router_core::audit::AuditSink;
use tool_router_core::cache::PlanCache;
use tool_router_core::circuit_breaker::CircuitBreaker;
use tool_router_core::config::RouterConfig;
use tool_router_core::history::PlanHistory;
use tool_router_core::provider::HttpLlmProvider;
use tool_router_core::rate_limiter::RateLimiter;
use tool_router_core::sql_planner::SqlPlanner;
use tool_router_core::sql_tool::SqlTool;
use tool_router_core::Dispatcher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

/// Enterprise tool router gateway.
#[derive(Debug, Parser)]
struct Cli {
    /// Delete expired plan-history rows and exit, instead of serving traffic.
    #[arg(long)]
    cleanup_history: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_router_server=info,tool_router_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let router_config = RouterConfig::from_env().context("loading router configuration")?;
    let server_config = crate::config::ServerConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&router_config.db.connection_string())
        .await
        .context("connecting to the warehouse database")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("running database migrations")?;

    let history = PlanHistory::new(pool.clone());
    if cli.cleanup_history {
        let deleted = history
            .cleanup()
            .await
            .context("cleaning up expired plan-history rows")?;
        tracing::info!(deleted, "plan-history cleanup complete");
        return Ok(());
    }

    let cache = PlanCache::connect(&router_config.cache).await;
    let rate_limiter = RateLimiter::connect(&router_config.rate_limiter).await;
    let audit = AuditSink::new(pool.clone());
    let breaker = CircuitBreaker::new(router_config.circuit_breaker.into());

    let planner = if router_config.provider.is_configured() {
        let provider = HttpLlmProvider::new(
            router_config.provider.base_url.clone().unwrap(),
            router_config.provider.api_key.clone().unwrap(),
            router_config.provider.model.clone(),
        );
        Some(SqlPlanner::new(Box::new(provider), breaker, cache, history))
    } else {
        tracing::warn!("LLM_BASE_URL/LLM_API_KEY not set; natural-language queries will be rejected");
        None
    };

    let sql_tool = SqlTool::new(pool, planner, &router_config);
    let dispatcher = Arc::new(Dispatcher::new(sql_tool, rate_limiter, audit));

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing the Prometheus metrics recorder")?;

    let state = AppState {
        dispatcher,
        metrics_handle,
    };

    let app = Router::new()
        .route("/health", get(routes::health_handler))
        .route("/metrics", get(routes::metrics_handler))
        .route("/query", post(routes::query_handler))
        .layer(middleware::trace_layer())
        .layer(middleware::cors_layer())
        .with_state(state);

    tracing::info!(bind_addr = %server_config.bind_addr, "starting tool-router-server");
    let listener = tokio::net::TcpListener::bind(server_config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
