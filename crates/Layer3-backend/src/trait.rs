//! Backend trait
//!
//! Both adapters conform to one capability: turn a collected commit context
//! into a sanitized, non-empty commit message within `timeout_seconds`.

use async_trait::async_trait;

use cmtr_core::CommitContext;
use cmtr_foundation::Settings;

use crate::error::BackendError;
use crate::message::GeneratedMessage;

/// A message generation strategy
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier shown in progress output ("api" or "codex")
    fn name(&self) -> &'static str;

    /// Generate a commit message for the staged changes.
    ///
    /// Size-bounding happens on the input side only; the output is
    /// sanitized but never truncated.
    async fn generate(
        &self,
        context: &CommitContext,
        settings: &Settings,
    ) -> Result<GeneratedMessage, BackendError>;
}
