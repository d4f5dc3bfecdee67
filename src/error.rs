use thiserror::Error;

use crate::provider::ProviderError;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The call was structurally invalid before any request was sent.
    #[error("invalid call: {0}")]
    Config(String),
    /// The provider or its transport failed. Surfaced unchanged.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;
