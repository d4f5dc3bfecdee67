use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured-output descriptor attached to a request.
///
/// The `schema` value is caller-owned JSON schema; the composer and the
/// backend forward it opaquely and never validate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Schema name reported to the provider.
    pub name: String,
    /// JSON schema constraining the model output.
    pub schema: Value,
    /// Whether the provider should enforce the schema strictly.
    pub strict: bool,
}

impl ResponseFormat {
    /// Creates a strict format from a name and a schema value.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }

    /// Relaxes strict schema enforcement.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }
}
