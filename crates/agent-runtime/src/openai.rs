//! OpenAI LLM Provider
//!
//! Chat completions over plain HTTP. Works with any OpenAI-compatible
//! endpoint via `OPENAI_API_BASE`.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::env_or;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// Base URL, e.g. `https://api.openai.com/v1`
    pub api_base: String,

    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_API_BASE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = env_or(&lookup, "OPENAI_API_KEY").ok_or_else(|| {
            AgentError::Config("OPENAI_API_KEY environment variable not set".into())
        })?;

        let config = Self::new(api_key);
        Ok(match env_or(&lookup, "OPENAI_API_BASE") {
            Some(base) => config.with_api_base(base),
            None => config,
        })
    }
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
        messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::Assistant => "assistant",
                    Role::User | Role::Tool => "user",
                },
                content: &m.content,
            })
            .collect()
    }
}

fn transport_error(e: &reqwest::Error) -> AgentError {
    if e.is_timeout() || e.is_connect() {
        AgentError::ProviderUnavailable(e.to_string())
    } else {
        AgentError::Provider(e.to_string())
    }
}

/// Map a non-2xx response to the matching error
async fn status_error(response: reqwest::Response, model: &str) -> AgentError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(body),
        StatusCode::NOT_FOUND => AgentError::Provider(format!("model '{model}' not found: {body}")),
        s if s.is_server_error() => AgentError::ProviderUnavailable(format!("HTTP {s}: {body}")),
        s => AgentError::Provider(format!("HTTP {s}: {body}")),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(api_base = %self.config.api_base, error = %e, "openai health check failed");
                Ok(false)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        debug!(model = %options.model, messages = messages.len(), "openai chat request");

        let request = ChatRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stop: (!options.stop_sequences.is_empty()).then_some(&options.stop_sequences),
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        if !response.status().is_success() {
            return Err(status_error(response, &options.model).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("unexpected chat response: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("no choices in chat response".into()))?;

        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("none"),
            prompt_tokens = body.usage.as_ref().map_or(0, |u| u.prompt_tokens),
            completion_tokens = body.usage.as_ref().map_or(0, |u| u.completion_tokens),
            "openai chat response"
        );

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: body.model.unwrap_or_else(|| options.model.clone()),
            usage: body.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_raw),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        if !response.status().is_success() {
            return Err(status_error(response, "*").await);
        }

        let body: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("unexpected model list: {e}")))?;

        Ok(body
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn provider(base: String) -> OpenAiProvider {
        OpenAiProvider::from_config(OpenAiConfig::new("sk-test").with_api_base(base)).unwrap()
    }

    #[test]
    fn test_config_requires_key() {
        let err = OpenAiConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        let config = OpenAiConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-x".into()),
            "OPENAI_API_BASE" => Some("http://localhost:8000/v1".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:8000/v1");
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let seen: Arc<Mutex<Option<(Value, String)>>> = Arc::default();
        let recorder = seen.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *recorder.lock().unwrap() = Some((body, auth));
                    Json(json!({
                        "model": "gpt-4.1-mini-2025-04-14",
                        "choices": [{
                            "message": {"role": "assistant", "content": "{\"symbol\": \"MSFT\"}"},
                            "finish_reason": "stop"
                        }],
                        "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
                    }))
                }
            }),
        );
        let provider = provider(serve(router).await);

        let messages = vec![
            Message::system("You are a stock advisor."),
            Message::user("What is my stock?"),
            Message::tool("get_user", "MSFT", None),
        ];
        let completion = provider
            .complete(&messages, &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.content, "{\"symbol\": \"MSFT\"}");
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
        assert_eq!(completion.usage.unwrap().total_tokens, 17);

        let (body, auth) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth, "Bearer sk-test");
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["messages"][2]["role"], "user");
        assert!(body.get("stop").is_none());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let router = Router::new()
            .route(
                "/v1/chat/completions",
                post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
            );
        let provider = provider(serve(router).await);

        let err = provider
            .complete(&[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_unreachable_is_unhealthy() {
        let provider = provider("http://127.0.0.1:9/v1".into());
        assert!(!provider.health_check().await.unwrap());
    }
}
