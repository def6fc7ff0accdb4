//! OpenAI-compatible chat-completions bridge.
//!
//! The core never talks to the provider directly; it goes through the
//! [`LanguageModel`] trait so routing and chat logic stay testable with a
//! mock. API key priority: `user_config.toml` > `OPENAI_API_KEY`. When no key
//! is configured the bridge is simply absent and every caller falls back to
//! keyword routing / canned replies.

use crate::config::UserConfig;
use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// One prior exchange turn passed as conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// External text/JSON generation capability. Both operations fail with
/// [`CoreError::Provider`] on non-2xx responses, timeouts, or malformed
/// content.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Request a JSON object reply (used by LLM routing). The raw text is
    /// returned as-is; the caller owns fence-stripping and validation.
    async fn generate_json(&self, system: &str, user: &str) -> Result<String, CoreError>;

    /// Request a free-text reply with conversation history.
    async fn generate_text(
        &self,
        system: &str,
        history: &[ChatTurn],
        user: &str,
    ) -> Result<String, CoreError>;
}

// OpenAI-compatible request/response shapes
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    content: Option<String>,
}

/// Reqwest-backed bridge to an OpenAI-compatible endpoint.
pub struct OpenAiBridge {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl OpenAiBridge {
    /// Create a bridge from `user_config.toml` / environment. Returns `None`
    /// when no plausible key is configured (length and `sk-` prefix checked).
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let user_config = UserConfig::load();
        let key = user_config.get_api_key()?;
        if key.len() < 20 || !key.starts_with("sk-") {
            tracing::warn!(target: "breezi::llm", "API key looks invalid, LLM bridge disabled");
            return None;
        }
        let model = user_config.get_llm_model().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = user_config
            .get_llm_api_url()
            .unwrap_or_else(|| OPENAI_API_BASE.to_string());
        Some(Self::new(key, model, api_base, timeout))
    }

    pub fn new(api_key: String, model: String, api_base: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model,
            api_base,
            client,
        }
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, CoreError> {
        let url = format!("{}/chat/completions", self.api_base);
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CoreError::Provider(format!("API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| CoreError::Provider(format!("response parse failed: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::Provider("empty completion".to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiBridge {
    async fn generate_json(&self, system: &str, user: &str) -> Result<String, CoreError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                WireMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(0.1),
            max_tokens: Some(300),
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        self.complete(request).await
    }

    async fn generate_text(
        &self,
        system: &str,
        history: &[ChatTurn],
        user: &str,
    ) -> Result<String, CoreError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
        for turn in history {
            messages.push(WireMessage {
                role: turn.role.clone(),
                content: turn.content.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.8),
            max_tokens: Some(200),
            response_format: None,
        };
        self.complete(request).await
    }
}
