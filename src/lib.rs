//! Provider-agnostic composition layer for multi-modal LLM chat calls.
//!
//! The crate builds ordered conversations (one system turn, opaque caller
//! history, one fresh user turn with optional image parts), merges call
//! options over documented defaults, hands the composed request to an
//! abstract [`provider::Provider`] backend, and narrows the response to
//! free text, a parsed object, or an absent-content sentinel. One
//! concrete backend speaks the OpenAI-style chat-completions protocol.

/// Request composition entry points.
pub mod chat;
/// TOML configuration loading.
pub mod config;
/// Crate error types.
pub mod error;
/// Image payload helpers for vision calls.
pub mod media;
/// Conversation data model.
pub mod message;
/// OpenAI-compatible chat-completions backend.
pub mod openai;
/// Call options and defaulting rules.
pub mod options;
/// Provider capability interface.
pub mod provider;
/// Structured-output schema descriptor.
pub mod schema;

pub use chat::{
    ChatParams, DEFAULT_SYSTEM_PROMPT, generate_json, generate_json_from_image, generate_text,
    generate_text_from_image, generate_text_from_images,
};
pub use config::{AiConfig, ModelRoster, OpenAiConfig};
pub use error::{Error, Result};
pub use message::{Content, ContentPart, Message, Role};
pub use openai::OpenAiClient;
pub use options::{CallOptions, DEFAULT_MODEL};
pub use provider::{ChatOutcome, ChatRequest, Provider, ProviderError, Usage};
pub use schema::ResponseFormat;
