use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::config::OpenAiConfig;
use crate::message::{Content, ContentPart, Message, Role};
use crate::provider::{ChatOutcome, ChatRequest, Provider, ProviderError, Usage};
use crate::schema::ResponseFormat;

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
const PROVIDER_NAME: &str = "openai";

/// Chat-completions client for OpenAI and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl OpenAiClient {
    /// Creates a client from the `OPENAI_API_KEY` env var.
    pub fn new() -> Result<Self, ProviderError> {
        let api_key = env::var(OPENAI_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey {
                key_env: OPENAI_KEY_ENV,
            })?;
        Ok(Self::with_api_key(api_key))
    }

    /// Creates a client from an explicit API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            client: reqwest::Client::new(),
            timeout: None,
        }
    }

    /// Creates a client from a config section. A missing key in the
    /// config falls back to the env var.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ProviderError> {
        let mut client = match &config.api_key {
            Some(key) => Self::with_api_key(key.clone()),
            None => Self::new()?,
        };
        if let Some(base_url) = &config.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(client)
    }

    /// Points the client at a compatible chat-completions endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request transport timeout, forwarded verbatim to the HTTP
    /// client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

fn wire_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::Image { url, detail } => {
            let mut image_url = Map::new();
            image_url.insert("url".to_string(), Value::String(url.clone()));
            if let Some(detail) = detail {
                image_url.insert("detail".to_string(), Value::String(detail.clone()));
            }
            json!({"type": "image_url", "image_url": image_url})
        }
    }
}

fn wire_message(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let content = match &message.content {
        Content::Text(text) => Value::String(text.clone()),
        Content::Parts(parts) => Value::Array(parts.iter().map(wire_part).collect()),
    };
    json!({"role": role, "content": content})
}

fn wire_response_format(format: &ResponseFormat) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": format.name,
            "schema": format.schema,
            "strict": format.strict,
        }
    })
}

/// Assembles the request body. The composed fields are written last so
/// ancillary parameters can never displace them.
fn wire_body(request: &ChatRequest) -> Value {
    let mut body = request.params.clone();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert(
        "messages".to_string(),
        Value::Array(request.messages.iter().map(wire_message).collect()),
    );
    if let Some(format) = &request.response_format {
        body.insert("response_format".to_string(), wire_response_format(format));
    }
    Value::Object(body)
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

fn narrow_response(parsed: ChatCompletionResponse) -> ChatOutcome {
    let usage = parsed.usage.map(|usage| Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty());
    ChatOutcome { content, usage }
}

#[async_trait]
impl Provider for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn submit(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
        let body = wire_body(&request);
        tracing::debug!(
            provider = PROVIDER_NAME,
            model = %request.model,
            turns = request.messages.len(),
            structured = request.response_format.is_some(),
            "dispatching chat completion"
        );

        let mut http = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        let response = http.send().await.map_err(|source| ProviderError::Request {
            provider: PROVIDER_NAME,
            source,
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER_NAME,
                status,
                body,
            });
        }

        let raw = response.text().await.map_err(|source| ProviderError::Request {
            provider: PROVIDER_NAME,
            source,
        })?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|source| ProviderError::Decode {
                provider: PROVIDER_NAME,
                source,
            })?;

        Ok(narrow_response(parsed))
    }
}
