use serde_json::{Map, Value, json};

/// Model used when the caller supplies none.
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";

/// Request fields owned by the composer. They cannot be smuggled in
/// through [`CallOptions::extra`].
const RESERVED_KEYS: [&str; 3] = ["model", "messages", "response_format"];

/// Per-call provider parameters.
///
/// Typed fields cover the common knobs; `extra` carries any other
/// provider parameter verbatim, unvalidated.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Model identifier. Falls back to [`DEFAULT_MODEL`].
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f64>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Additional provider parameters, forwarded opaquely.
    pub extra: Map<String, Value>,
}

impl CallOptions {
    /// Returns the model for this call: the typed field, else a `model`
    /// string in `extra`, else [`DEFAULT_MODEL`].
    pub fn resolved_model(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        if let Some(Value::String(model)) = self.extra.get("model") {
            return model.clone();
        }
        DEFAULT_MODEL.to_string()
    }

    /// Flattens the ancillary parameters into one map, typed fields
    /// layered over `extra`. Reserved request fields are excluded.
    pub fn ancillary_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        for (key, value) in &self.extra {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                params.insert(key.clone(), value.clone());
            }
        }
        if let Some(temperature) = self.temperature {
            params.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_p) = self.top_p {
            params.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(max_tokens) = self.max_tokens {
            params.insert("max_tokens".to_string(), json!(max_tokens));
        }
        params
    }
}
