//! LLM provider capability (§4.2): a narrow interface behind which one live
//! (HTTP, OpenAI-compatible) and one deterministic test implementation live.

mod http;
mod scripted;

pub use http::HttpLlmProvider;
pub use scripted::ScriptedProvider;

use crate::error::RouterError;
use crate::model::{Plan, Usage};
use async_trait::async_trait;
use std::time::Duration;

/// Abstract capability: natural-language prompt in, schema-valid [`Plan`]
/// and [`Usage`] out, bounded by `timeout`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_plan(&self, prompt: &str, timeout: Duration) -> Result<(Plan, Usage), RouterError>;
}
