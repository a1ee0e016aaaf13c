//! Error types for Dossier.
//!
//! Library crates use [`DossierError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Dossier operations.
#[derive(Debug, thiserror::Error)]
pub enum DossierError {
    /// The subject identifier has no registry mapping.
    #[error("unknown subject: {id}")]
    UnknownSubject { id: String },

    /// Network, HTTP, or parsing failure while retrieving one source page.
    #[error("failed to fetch {url}: {message}")]
    SourceFetch { url: String, message: String },

    /// Chunk size/overlap combination that cannot produce windows.
    #[error(
        "invalid chunk configuration: max_size={max_size}, overlap={overlap} \
         (requires max_size > 0 and overlap < max_size)"
    )]
    InvalidChunkConfiguration { max_size: usize, overlap: usize },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (duplicate ids, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization error in the metadata store.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DossierError>;

impl DossierError {
    /// Create an unknown-subject error.
    pub fn unknown_subject(id: impl Into<String>) -> Self {
        Self::UnknownSubject { id: id.into() }
    }

    /// Create a source fetch error for the given URL.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceFetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is confined to a single source page.
    ///
    /// Per-page failures are the only kind the batch policy absorbs.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::SourceFetch { .. })
    }
}
