//! Error types for the edgequake-blogpost library.
//!
//! Every fallible operation returns [`BlogError`]. The variants map onto six
//! failure kinds ([`ErrorKind`]) that the CLI uses to pick troubleshooting
//! hints; the remaining variants cover output, configuration and internal
//! failures that sit outside the extraction/generation/render path.
//!
//! A malformed special block in the generated markdown is never an error: it
//! falls through to plain markdown conversion.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlogError>;

/// All errors returned by the edgequake-blogpost library.
#[derive(Debug, Error)]
pub enum BlogError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The reference is neither a URL nor an existing path.
    #[error("Input not found: '{reference}'\nPass an http(s) URL or the path of an existing file.")]
    NotFound { reference: String },

    /// Fetching a URL failed (connection, non-success status, timeout).
    #[error("Failed to fetch '{url}': {reason}\nCheck your internet connection and the URL.")]
    Fetch { url: String, reason: String },

    /// An extractor could not read text out of the source.
    #[error("Could not extract text from {what}: {detail}")]
    Extraction {
        what: String,
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The input violates a limit before any extraction is attempted.
    #[error("Invalid input: {0}")]
    Validation(String),

    // ── Format errors ─────────────────────────────────────────────────────
    /// A date, front-matter block or similar structured value is malformed.
    #[error("Malformed value: {0}")]
    Format(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The generation service failed, timed out, or returned nothing usable.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure category, used to select user-facing hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Fetch,
    Extraction,
    Validation,
    Format,
    Generation,
    Other,
}

impl BlogError {
    /// Build an [`BlogError::Extraction`] that keeps the underlying cause.
    pub fn extraction<E>(what: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BlogError::Extraction {
            what: what.into(),
            detail: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an [`BlogError::Extraction`] with a plain message and no cause.
    pub fn extraction_msg(what: impl Into<String>, detail: impl Into<String>) -> Self {
        BlogError::Extraction {
            what: what.into(),
            detail: detail.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BlogError::NotFound { .. } => ErrorKind::NotFound,
            BlogError::Fetch { .. } => ErrorKind::Fetch,
            BlogError::Extraction { .. } => ErrorKind::Extraction,
            BlogError::Validation(_) => ErrorKind::Validation,
            BlogError::Format(_) => ErrorKind::Format,
            BlogError::Generation(_) | BlogError::ProviderNotConfigured { .. } => {
                ErrorKind::Generation
            }
            BlogError::OutputWriteFailed { .. }
            | BlogError::InvalidConfig(_)
            | BlogError::Internal(_) => ErrorKind::Other,
        }
    }
}
