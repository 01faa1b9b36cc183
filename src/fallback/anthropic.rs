//! Anthropic fallback client.
//!
//! Messages-API client used as the fallback answerer. The prompt embeds a
//! bounded CSV preview of the session's table so the model answers from the
//! actual data rather than guessing at the schema.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::FallbackAnswerer;
use crate::table::Table;

/// Default Anthropic model
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Rows of table context included in the prompt.
const PREVIEW_ROWS: usize = 50;

const SYSTEM_PROMPT: &str = "You are a data assistant for a tabular dataset. Answer the user's \
     question using only the table provided. Be concise; if the table cannot answer the \
     question, say so.";

/// Anthropic Claude API client
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicClient {
    /// Create a new client with the given API key
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    async fn call_api(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": &self.model,
                "max_tokens": 1024,
                "system": system_prompt,
                "messages": [{"role": "user", "content": user_prompt}]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| anyhow!("Empty response from Anthropic"))
    }
}

#[async_trait]
impl FallbackAnswerer for AnthropicClient {
    async fn answer(&self, instruction: &str, table: &Table) -> Result<String> {
        let user_prompt = format!(
            "Table ({} rows):\n{}\n\nQuestion: {}",
            table.len(),
            table.preview(PREVIEW_ROWS),
            instruction
        );
        self.call_api(SYSTEM_PROMPT, &user_prompt).await
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
