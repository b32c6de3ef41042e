//! HTTP client for OpenAI-compatible and Anthropic chat endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::env::expand_env;
use super::{ChatBackend, ChatMessage};
use crate::descriptor::AgentConfig;
use crate::descriptor::llm::PROVIDER_ANTHROPIC;
use crate::errors::LlmError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 1024;
const USER_AGENT: &str = concat!("l10n/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Error body shared by both providers.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Production [`ChatBackend`] over HTTP.
#[derive(Debug, Clone, Default)]
pub struct LlmClient {
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn post(
        &self,
        agent: &AgentConfig,
        headers: BTreeMap<String, String>,
        body: &impl Serialize,
    ) -> Result<String, LlmError> {
        let base_url = agent.base_url().ok_or(LlmError::MissingBaseUrl)?;
        let url = format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            agent.chat_completions_path().unwrap_or_default()
        );
        let timeout = Duration::from_secs(agent.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let mut request = self
            .http
            .post(&url)
            .timeout(timeout)
            .header("User-Agent", USER_AGENT)
            .json(body);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(url = %url, provider = agent.provider(), "Sending chat request");
        let response = request.send().await.map_err(LlmError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(LlmError::Transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|error| error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(LlmError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(text)
    }

    async fn chat_openai(
        &self,
        agent: &AgentConfig,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model,
            messages,
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        };
        let text = self.post(agent, resolve_headers(agent), &body).await?;
        let parsed: ChatResponse = serde_json::from_str(&text).map_err(LlmError::Decode)?;
        parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse("choices"))?
            .message
            .content
            .ok_or(LlmError::EmptyResponse("content"))
    }

    async fn chat_anthropic(
        &self,
        agent: &AgentConfig,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let mut system = Vec::new();
        let mut turns = Vec::with_capacity(messages.len());
        for message in messages {
            match message.role.trim().to_ascii_lowercase().as_str() {
                "system" => {
                    if !message.content.trim().is_empty() {
                        system.push(message.content.as_str());
                    }
                }
                "user" => turns.push(AnthropicMessage {
                    role: "user",
                    content: &message.content,
                }),
                "assistant" => turns.push(AnthropicMessage {
                    role: "assistant",
                    content: &message.content,
                }),
                _ => {
                    return Err(LlmError::UnsupportedRole {
                        provider: PROVIDER_ANTHROPIC.to_string(),
                        role: message.role.clone(),
                    });
                }
            }
        }
        if turns.is_empty() {
            return Err(LlmError::NoUserMessages);
        }

        let body = AnthropicRequest {
            model,
            max_tokens: agent
                .max_tokens
                .filter(|tokens| *tokens > 0)
                .unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
            messages: turns,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            temperature: agent.temperature,
        };
        let text = self.post(agent, resolve_headers(agent), &body).await?;
        let parsed: AnthropicResponse = serde_json::from_str(&text).map_err(LlmError::Decode)?;
        if parsed.content.is_empty() {
            return Err(LlmError::EmptyResponse("content"));
        }
        let out: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();
        if out.is_empty() {
            return Err(LlmError::EmptyResponse("text"));
        }
        Ok(out)
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn chat(
        &self,
        agent: &AgentConfig,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        if model.trim().is_empty() {
            return Err(LlmError::MissingModel);
        }
        if agent.provider().trim().eq_ignore_ascii_case(PROVIDER_ANTHROPIC) {
            self.chat_anthropic(agent, model, messages).await
        } else {
            self.chat_openai(agent, model, messages).await
        }
    }
}

fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// API key from `api_key` (after expansion) or the `api_key_env` variable.
fn resolve_api_key(agent: &AgentConfig) -> Option<String> {
    let explicit = agent
        .api_key
        .as_deref()
        .map(|key| expand_env(key).trim().to_string())
        .filter(|key| !key.is_empty());
    explicit.or_else(|| {
        agent
            .api_key_env
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .and_then(|name| std::env::var(name.trim()).ok())
            .filter(|key| !key.is_empty())
    })
}

/// Configured headers with environment references expanded, plus credentials and
/// provider headers the user did not set explicitly.
fn resolve_headers(agent: &AgentConfig) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = agent
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), expand_env(value)))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    if agent.provider().trim().eq_ignore_ascii_case(PROVIDER_ANTHROPIC) {
        if !has_header(&headers, "x-api-key")
            && let Some(key) = resolve_api_key(agent)
        {
            headers.insert("x-api-key".to_string(), key);
        }
        if !has_header(&headers, "anthropic-version") {
            headers.insert("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string());
        }
    } else if !has_header(&headers, "authorization")
        && let Some(key) = resolve_api_key(agent)
    {
        headers.insert("Authorization".to_string(), format!("Bearer {key}"));
    }
    headers
}
