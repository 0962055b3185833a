//! Error types for cmtr
//!
//! Every layer converts its local errors into this central type at the
//! boundary, so the CLI has a single taxonomy to report.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// cmtr error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error(transparent)]
    Config(#[from] ConfigError),

    // ========================================================================
    // Repository state
    // ========================================================================
    #[error("{0}")]
    Git(String),

    #[error("No staged changes found. Stage files before running cmtr.")]
    NoStagedChanges,

    // ========================================================================
    // Backend selection and generation
    // ========================================================================
    #[error("{api} and {codex}. Set OPENAI_API_KEY or run `npx @openai/codex@latest` to sign in.")]
    NoBackendAvailable { api: String, codex: String },

    #[error("{0}")]
    Backend(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: f64 },

    // ========================================================================
    // Hook lifecycle
    // ========================================================================
    #[error(
        "A prepare-commit-msg hook at {} was not installed by cmtr. \
         Pass --force with --hook to overwrite it.",
        .path.display()
    )]
    HookConflict { path: PathBuf },

    // ========================================================================
    // Usage
    // ========================================================================
    #[error("{0}")]
    Usage(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Backend failure helper
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// Usage error helper for invalid command-line input
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }
}
