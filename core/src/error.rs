//! Error types for core type parsing.

use thiserror::Error;

/// Errors raised while decoding core wire types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An OData page body was not valid JSON of the expected shape.
    #[error("malformed page: {0}")]
    MalformedPage(#[from] serde_json::Error),

    /// A language code was not one of the supported locales.
    #[error("unknown language '{0}'")]
    UnknownLang(String),
}

/// Convenience alias for results with [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
