use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::message::Message;
use crate::schema::ResponseFormat;

/// Composed request handed to a provider backend.
///
/// `messages` and `response_format` are owned by the composer; `params`
/// holds the merged ancillary call parameters. Backends write the wire
/// format; they must not let `params` displace the composed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Resolved model identifier.
    pub model: String,
    /// Full ordered conversation.
    pub messages: Vec<Message>,
    /// Structured-output descriptor, when the call requires one.
    pub response_format: Option<ResponseFormat>,
    /// Merged ancillary call parameters.
    pub params: Map<String, Value>,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Narrowed provider response.
///
/// `content` is `None` when the provider succeeded but produced no
/// usable output; that is a result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    /// Raw message content of the first choice.
    pub content: Option<String>,
    /// Token usage, when the provider reports it.
    pub usage: Option<Usage>,
}

/// Failure surfaced by a provider backend or its transport.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The credential env var is unset or empty.
    #[error("{key_env} is not set in the environment")]
    MissingApiKey {
        /// Name of the env var consulted.
        key_env: &'static str,
    },
    /// The HTTP request itself failed.
    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with a non-success status.
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },
    /// The response body was not valid provider JSON.
    #[error("{provider} returned an undecodable response: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Capability interface implemented by each LLM backend.
///
/// One composed request in, one narrowed outcome out. Backends own the
/// wire format, credentials, and transport policy; the composer never
/// looks past this seam.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short backend name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Executes one request round trip.
    async fn submit(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError>;
}
