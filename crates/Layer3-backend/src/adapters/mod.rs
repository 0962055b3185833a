//! Backend adapters - one per generation service

pub mod codex;
pub mod openai;

pub use codex::{CodexBackend, DEFAULT_CODEX_MODEL};
pub use openai::OpenAiBackend;

use std::time::Duration;

/// Translate `timeout_seconds` into a bound. Zero and non-finite values
/// mean "no limit".
pub(crate) fn effective_timeout(seconds: f64) -> Option<Duration> {
    if seconds.is_finite() && seconds > 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}
