//! Server-only configuration: bind address and anything below the request
//! pipeline that `tool-router-core::config::RouterConfig` doesn't own.

use anyhow::Context;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";

    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("BIND_ADDR").unwrap_or_else(|_| Self::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw
            .parse()
            .with_context(|| format!("invalid BIND_ADDR: {raw}"))?;
        Ok(Self { bind_addr })
    }
}
