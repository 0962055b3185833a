//! # cmtr-backend
//!
//! Message generation backends for cmtr:
//! - OpenAI Responses API over HTTP
//! - Codex CLI as a subprocess, with an npx fallback launcher
//!
//! Selection between them is a single decision table shared with the
//! `auth status` surface. Both adapters honor `timeout_seconds` and return
//! a sanitized, non-empty `GeneratedMessage`.

pub mod adapters;
pub mod error;
pub mod message;
pub mod probe;
pub mod select;
pub mod r#trait;

// Adapters
pub use adapters::{CodexBackend, OpenAiBackend, DEFAULT_CODEX_MODEL};

// Trait and message
pub use message::GeneratedMessage;
pub use r#trait::Backend;

// Probe and selection
pub use probe::{codex_auth_path, CodexStatus};
pub use select::{
    auth_report, build_backend, run_backend, select_backend, AuthReport, BackendChoice, Selection,
};

// Error
pub use error::BackendError;
