use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::message::{Content, ContentPart, Message, Role};
use crate::options::CallOptions;
use crate::provider::{ChatRequest, Provider};
use crate::schema::ResponseFormat;

/// Persona used when the caller supplies no system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Resolution hint attached to every composed image part.
const IMAGE_DETAIL: &str = "high";

/// Shared per-call configuration bundle.
///
/// All fields default: an empty bundle composes a two-turn conversation
/// (default persona, then the prompt) against the default model.
#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    /// System prompt. Falls back to [`DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
    /// Prior turns, passed through unmodified between the system turn
    /// and the fresh user turn.
    pub history: Vec<Message>,
    /// Provider call parameters.
    pub options: CallOptions,
}

/// Builds the ordered conversation: one system turn, the history turns
/// in caller order, one fresh user turn.
fn build_messages(params: &ChatParams, user_content: Content) -> Vec<Message> {
    let system = params
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let mut messages = Vec::with_capacity(params.history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(params.history.iter().cloned());
    messages.push(Message {
        role: Role::User,
        content: user_content,
    });
    messages
}

fn compose_request(
    params: &ChatParams,
    user_content: Content,
    response_format: Option<&ResponseFormat>,
) -> ChatRequest {
    ChatRequest {
        model: params.options.resolved_model(),
        messages: build_messages(params, user_content),
        response_format: response_format.cloned(),
        params: params.options.ancillary_params(),
    }
}

/// One text part holding the prompt, then one image part per URL, in
/// input order.
fn vision_content(prompt: &str, image_urls: &[String]) -> Content {
    let mut parts = Vec::with_capacity(image_urls.len() + 1);
    parts.push(ContentPart::Text {
        text: prompt.to_string(),
    });
    parts.extend(image_urls.iter().map(|url| ContentPart::Image {
        url: url.clone(),
        detail: Some(IMAGE_DETAIL.to_string()),
    }));
    Content::Parts(parts)
}

fn parse_structured<T: DeserializeOwned>(content: Option<String>) -> Option<T> {
    let raw = content?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(error = %err, "structured response did not parse");
            None
        }
    }
}

/// Asks for a free-text completion.
///
/// Returns `Ok(None)` when the provider succeeds without producing
/// content. Provider failures propagate unchanged.
pub async fn generate_text<P: Provider>(
    provider: &P,
    prompt: &str,
    params: &ChatParams,
) -> Result<Option<String>> {
    let request = compose_request(params, Content::Text(prompt.to_string()), None);
    let outcome = provider.submit(request).await?;
    Ok(outcome.content)
}

/// Asks for a completion constrained by `format` and parses it into `T`.
///
/// Returns `Ok(None)` when the provider produced no content, or content
/// that does not conform to `T`.
pub async fn generate_json<T, P>(
    provider: &P,
    prompt: &str,
    params: &ChatParams,
    format: &ResponseFormat,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
    P: Provider,
{
    let request = compose_request(params, Content::Text(prompt.to_string()), Some(format));
    let outcome = provider.submit(request).await?;
    Ok(parse_structured(outcome.content))
}

/// Asks for a free-text completion about a list of images.
///
/// The user turn carries the prompt as a text part followed by one
/// image part per URL. An empty list fails before any provider call.
pub async fn generate_text_from_images<P: Provider>(
    provider: &P,
    prompt: &str,
    params: &ChatParams,
    image_urls: &[String],
) -> Result<Option<String>> {
    if image_urls.is_empty() {
        return Err(Error::Config(
            "at least one image URL is required".to_string(),
        ));
    }
    let request = compose_request(params, vision_content(prompt, image_urls), None);
    let outcome = provider.submit(request).await?;
    Ok(outcome.content)
}

/// Single-image variant of [`generate_text_from_images`].
pub async fn generate_text_from_image<P: Provider>(
    provider: &P,
    prompt: &str,
    params: &ChatParams,
    image_url: &str,
) -> Result<Option<String>> {
    let image_urls = [image_url.to_string()];
    generate_text_from_images(provider, prompt, params, &image_urls).await
}

/// Image-augmented structured call: the user turn carries the image,
/// the response is constrained by `format` and parsed into `T`.
pub async fn generate_json_from_image<T, P>(
    provider: &P,
    prompt: &str,
    params: &ChatParams,
    image_url: &str,
    format: &ResponseFormat,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
    P: Provider,
{
    let image_urls = [image_url.to_string()];
    let request = compose_request(
        params,
        vision_content(prompt, &image_urls),
        Some(format),
    );
    let outcome = provider.submit(request).await?;
    Ok(parse_structured(outcome.content))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    use super::{ChatParams, DEFAULT_SYSTEM_PROMPT, compose_request};
    use crate::error::Error;
    use crate::message::{Content, ContentPart, Message};
    use crate::options::{CallOptions, DEFAULT_MODEL};
    use crate::provider::{ChatOutcome, ChatRequest, Provider, ProviderError};
    use crate::schema::ResponseFormat;

    struct MockProvider {
        requests: Mutex<Vec<ChatRequest>>,
        reply: Option<String>,
    }

    impl MockProvider {
        fn replying(reply: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Some(reply.to_string()),
            }
        }

        fn silent() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: None,
            }
        }

        fn recorded(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn submit(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
            self.requests.lock().unwrap().push(request);
            Ok(ChatOutcome {
                content: self.reply.clone(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn default_call_composes_two_turns_and_default_model() {
        let provider = MockProvider::replying("Hi there");
        let reply = super::generate_text(&provider, "Hello", &ChatParams::default())
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("Hi there"));

        let requests = provider.recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, DEFAULT_MODEL);
        assert_eq!(
            requests[0].messages,
            vec![Message::system(DEFAULT_SYSTEM_PROMPT), Message::user("Hello")]
        );
        assert!(requests[0].response_format.is_none());
    }

    #[tokio::test]
    async fn explicit_system_prompt_is_used_verbatim() {
        let provider = MockProvider::replying("ok");
        let params = ChatParams {
            system_prompt: Some("You are a terse reviewer.".to_string()),
            ..ChatParams::default()
        };
        super::generate_text(&provider, "Review this", &params)
            .await
            .unwrap();
        assert_eq!(
            provider.recorded()[0].messages[0],
            Message::system("You are a terse reviewer.")
        );
    }

    #[tokio::test]
    async fn history_sits_between_system_and_user_in_order() {
        let provider = MockProvider::replying("ok");
        let params = ChatParams {
            history: vec![Message::user("first"), Message::assistant("second")],
            ..ChatParams::default()
        };
        super::generate_text(&provider, "third", &params)
            .await
            .unwrap();

        let messages = &provider.recorded()[0].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1], Message::user("first"));
        assert_eq!(messages[2], Message::assistant("second"));
        assert_eq!(messages[3], Message::user("third"));
    }

    #[tokio::test]
    async fn explicit_model_is_used_exactly() {
        let provider = MockProvider::replying("ok");
        let params = ChatParams {
            options: CallOptions {
                model: Some("gpt-4o-mini".to_string()),
                ..CallOptions::default()
            },
            ..ChatParams::default()
        };
        super::generate_text(&provider, "Hello", &params)
            .await
            .unwrap();
        assert_eq!(provider.recorded()[0].model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn vision_turn_is_one_text_part_then_images_in_order() {
        let provider = MockProvider::replying("a cat and a dog");
        let urls = vec![
            "http://x/a.png".to_string(),
            "http://x/b.png".to_string(),
        ];
        super::generate_text_from_images(&provider, "Compare", &ChatParams::default(), &urls)
            .await
            .unwrap();

        let last = provider.recorded()[0].messages.last().unwrap().clone();
        assert_eq!(
            last.content,
            Content::Parts(vec![
                ContentPart::Text {
                    text: "Compare".to_string()
                },
                ContentPart::Image {
                    url: "http://x/a.png".to_string(),
                    detail: Some("high".to_string()),
                },
                ContentPart::Image {
                    url: "http://x/b.png".to_string(),
                    detail: Some("high".to_string()),
                },
            ])
        );
    }

    #[tokio::test]
    async fn single_image_is_the_one_element_specialization() {
        let provider = MockProvider::replying("a cat");
        super::generate_text_from_image(
            &provider,
            "Describe",
            &ChatParams::default(),
            "http://x/img.png",
        )
        .await
        .unwrap();

        let last = provider.recorded()[0].messages.last().unwrap().clone();
        assert_eq!(
            last.content,
            Content::Parts(vec![
                ContentPart::Text {
                    text: "Describe".to_string()
                },
                ContentPart::Image {
                    url: "http://x/img.png".to_string(),
                    detail: Some("high".to_string()),
                },
            ])
        );
    }

    #[tokio::test]
    async fn empty_image_list_fails_before_any_provider_call() {
        let provider = MockProvider::replying("unreachable");
        let result =
            super::generate_text_from_images(&provider, "Describe", &ChatParams::default(), &[])
                .await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(provider.recorded().is_empty());
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Extracted {
        name: String,
    }

    fn name_format() -> ResponseFormat {
        ResponseFormat::new(
            "extraction",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"],
            }),
        )
    }

    #[tokio::test]
    async fn structured_call_attaches_format_and_parses() {
        let provider = MockProvider::replying(r#"{"name": "Ada"}"#);
        let format = name_format();
        let parsed: Option<Extracted> =
            super::generate_json(&provider, "Extract name", &ChatParams::default(), &format)
                .await
                .unwrap();
        assert_eq!(
            parsed,
            Some(Extracted {
                name: "Ada".to_string()
            })
        );

        let request = &provider.recorded()[0];
        assert_eq!(request.response_format.as_ref().unwrap().name, "extraction");
    }

    #[tokio::test]
    async fn structured_call_without_content_is_none() {
        let provider = MockProvider::silent();
        let format = name_format();
        let parsed: Option<Extracted> =
            super::generate_json(&provider, "Extract name", &ChatParams::default(), &format)
                .await
                .unwrap();
        assert_eq!(parsed, None);
    }

    #[tokio::test]
    async fn unparseable_structured_content_is_none() {
        let provider = MockProvider::replying("not json at all");
        let format = name_format();
        let parsed: Option<Extracted> =
            super::generate_json(&provider, "Extract name", &ChatParams::default(), &format)
                .await
                .unwrap();
        assert_eq!(parsed, None);
    }

    #[tokio::test]
    async fn structured_vision_call_combines_both_paths() {
        let provider = MockProvider::replying(r#"{"name": "receipt"}"#);
        let format = name_format();
        let parsed: Option<Extracted> = super::generate_json_from_image(
            &provider,
            "Name this document",
            &ChatParams::default(),
            "http://x/doc.png",
            &format,
        )
        .await
        .unwrap();
        assert_eq!(
            parsed,
            Some(Extracted {
                name: "receipt".to_string()
            })
        );

        let request = &provider.recorded()[0];
        assert!(request.response_format.is_some());
        assert!(matches!(
            request.messages.last().unwrap().content,
            Content::Parts(_)
        ));
    }

    #[test]
    fn composition_is_idempotent() {
        let params = ChatParams {
            system_prompt: Some("sys".to_string()),
            history: vec![Message::user("h")],
            options: CallOptions {
                temperature: Some(0.3),
                ..CallOptions::default()
            },
        };
        let format = name_format();
        let first = compose_request(&params, Content::Text("p".to_string()), Some(&format));
        let second = compose_request(&params, Content::Text("p".to_string()), Some(&format));
        assert_eq!(first, second);
    }
}
