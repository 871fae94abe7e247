//! HTTP-based, OpenAI-compatible chat-completion provider.
//!
//! Sends a JSON-mode chat completion request over `reqwest` with bearer
//! auth, then runs the response through [`crate::planner_schema`] before it
//! is ever treated as a [`Plan`]. Never logs prompt/response bodies verbatim
//! (§4.2) — only token counts and the derived query hash make it into spans.

use super::LlmProvider;
use crate::error::RouterError;
use crate::model::{Plan, Usage};
use crate::planner_schema::{validate_plan, RawPlan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// GPT-4o-class pricing, per million tokens. Matches the reference cost
/// model; override by swapping the provider if pricing diverges.
const INPUT_COST_PER_MTOK: f64 = 2.50;
const OUTPUT_COST_PER_MTOK: f64 = 10.00;

pub struct HttpLlmProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

fn system_preamble() -> &'static str {
    "You must respond with valid JSON matching this schema: \
     {\"sql\": string, \"confidence\": number in [0,1], \"explanation\": string}. \
     The sql field must be a single SELECT statement containing a LIMIT clause \
     with a positive integer. Respond with ONLY the JSON object, no other text."
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn generate_plan(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(Plan, Usage), RouterError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_preamble(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            max_tokens: 4096,
        };

        let send = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| RouterError::timeout("LLM provider call exceeded timeout"))?
            .map_err(|e| RouterError::planning(format!("LLM provider request failed: {e}")))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RouterError::planning(format!("LLM provider returned invalid JSON: {e}")))?;

        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| RouterError::planning("empty response from LLM provider"))?;

        let raw: RawPlan = serde_json::from_str(&content)
            .map_err(|e| RouterError::planning(format!("planner output was not valid JSON: {e}")))?;
        let plan = validate_plan(raw)?;

        let (input_tokens, output_tokens) = body
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));
        let estimated_cost_usd = (input_tokens as f64 / 1_000_000.0) * INPUT_COST_PER_MTOK
            + (output_tokens as f64 / 1_000_000.0) * OUTPUT_COST_PER_MTOK;

        Ok((
            plan,
            Usage {
                input_tokens,
                output_tokens,
                estimated_cost_usd,
            },
        ))
    }
}
