//! Error types for crawling and loading.
//!
//! Everything that reaches a caller is fatal for the current run: timeouts
//! are retried inside the fetcher and row skips never leave a procedure.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while crawling the feeds.
#[derive(Debug, Error)]
pub enum SpiderError {
    /// Blob store or configuration failure.
    #[error(transparent)]
    Store(#[from] hypercube_store::StoreError),

    /// Database, migration or row-consistency failure.
    #[error(transparent)]
    Sqlite(#[from] hypercube_sqlite::SqliteError),

    /// Malformed OData page.
    #[error(transparent)]
    Core(#[from] hypercube_core::CoreError),

    /// Non-retryable transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A base URI or next-page link could not be parsed.
    #[error("invalid URI: {0}")]
    Url(#[from] url::ParseError),

    /// Malformed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A response or file did not have the content type its loader reads.
    #[error("expected {expected} from {source_name} but found '{found}'")]
    UnexpectedContentType {
        source_name: String,
        expected: &'static str,
        found: String,
    },

    /// `--only` named a loader that does not exist.
    #[error("unknown loader '{0}'")]
    UnknownLoader(String),

    /// A document did not have the structure its loader relies on.
    #[error("unexpected document structure: {0}")]
    UnexpectedDocument(String),
}

impl From<rusqlite::Error> for SpiderError {
    fn from(err: rusqlite::Error) -> Self {
        SpiderError::Sqlite(err.into())
    }
}

impl SpiderError {
    /// Returns `true` for failures meaning the source data no longer matches
    /// the loaders' assumptions, as opposed to I/O or environment problems.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            SpiderError::UnexpectedContentType { .. }
                | SpiderError::UnexpectedDocument(_)
                | SpiderError::Sqlite(hypercube_sqlite::SqliteError::CheckFailed { .. })
                | SpiderError::Sqlite(hypercube_sqlite::SqliteError::MissingField(_))
                | SpiderError::Sqlite(hypercube_sqlite::SqliteError::SchemaTooNew { .. })
        )
    }
}

/// Convenience alias for results with [`SpiderError`].
pub type Result<T> = std::result::Result<T, SpiderError>;
