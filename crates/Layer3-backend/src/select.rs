//! Backend selection
//!
//! One decision table, evaluated in order, first match wins:
//! 1. `prefer_codex` forces codex; missing tooling or auth is a hard error
//! 2. an API key selects the API
//! 3. an installed, signed-in codex selects codex
//! 4. otherwise: no backend, reported with both missing prerequisites
//!
//! Both the generation path and `cmtr auth status` consult this table, so
//! what the status surface prints is always what generation would do.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use cmtr_core::CommitContext;
use cmtr_foundation::{Error, Result, Settings};

use crate::adapters::{CodexBackend, OpenAiBackend};
use crate::error::BackendError;
use crate::message::GeneratedMessage;
use crate::probe::CodexStatus;
use crate::r#trait::Backend;

/// Which backend generates the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Api,
    Codex,
}

impl BackendChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendChoice::Api => "api",
            BackendChoice::Codex => "codex",
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A choice plus the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub choice: BackendChoice,
    pub reason: &'static str,
}

/// Apply the decision table
pub fn select_backend(settings: &Settings, codex: &CodexStatus) -> Result<Selection> {
    if settings.prefer_codex {
        if !codex.has_binary() {
            return Err(Error::backend(
                "Codex is not installed. Install Codex or run `npx @openai/codex@latest`.",
            ));
        }
        if !codex.auth_exists {
            return Err(Error::backend(
                "Codex auth not found. Run `codex` or `npx @openai/codex@latest` to sign in.",
            ));
        }
        return Ok(Selection {
            choice: BackendChoice::Codex,
            reason: "prefer_codex is enabled",
        });
    }

    if settings.api_key.as_deref().is_some_and(|key| !key.is_empty()) {
        return Ok(Selection {
            choice: BackendChoice::Api,
            reason: "OPENAI_API_KEY is set",
        });
    }

    if codex.is_available() {
        return Ok(Selection {
            choice: BackendChoice::Codex,
            reason: "codex CLI is installed and authenticated",
        });
    }

    let codex_reason = if !codex.has_binary() && !codex.auth_exists {
        "Codex is not available"
    } else if !codex.has_binary() {
        "Codex is not installed"
    } else {
        "Codex is not signed in"
    };
    Err(Error::NoBackendAvailable {
        api: "OPENAI_API_KEY is not set".to_string(),
        codex: codex_reason.to_string(),
    })
}

/// Construct the adapter for a selection
pub fn build_backend(
    selection: Selection,
    settings: &Settings,
    codex: &CodexStatus,
    repo_root: &Path,
) -> Result<Box<dyn Backend>> {
    match selection.choice {
        BackendChoice::Api => {
            let api_key = settings
                .api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| Error::backend("OPENAI_API_KEY is not set in the environment."))?;
            Ok(Box::new(OpenAiBackend::new(api_key, settings)?))
        }
        BackendChoice::Codex => Ok(Box::new(CodexBackend::new(codex.clone(), repo_root))),
    }
}

/// Generate a message with the selected backend, attaching the right
/// remedy when codex fails
pub async fn run_backend(
    selection: Selection,
    settings: &Settings,
    codex: &CodexStatus,
    repo_root: &Path,
    context: &CommitContext,
) -> Result<GeneratedMessage> {
    let backend = build_backend(selection, settings, codex, repo_root)?;
    debug!(
        backend = backend.name(),
        reason = selection.reason,
        "generating commit message"
    );
    match backend.generate(context, settings).await {
        Ok(message) => Ok(message),
        Err(BackendError::Codex(message)) => {
            let remedy = if settings.prefer_codex {
                "Install/login to Codex."
            } else {
                "Install/login to Codex or set OPENAI_API_KEY."
            };
            let message = message.trim_end_matches('.');
            Err(Error::Backend(format!("Codex failed: {message}. {remedy}")))
        }
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Auth status report
// ============================================================================

/// Everything `cmtr auth status` prints, assembled from the same probe
/// snapshot and decision table as generation
#[derive(Debug, Clone)]
pub struct AuthReport {
    pub api_key_set: bool,
    pub codex_installed: bool,
    pub npx_installed: bool,
    pub auth_exists: bool,
    pub auth_path: PathBuf,
    /// `None` when config loading failed
    pub prefer_codex: Option<bool>,
    /// "api", "codex", "error", or "unknown"
    pub mode: String,
    pub note: Option<String>,
}

/// Build the status report. `settings` is `None` when config loading
/// failed; selection still runs whenever settings are present.
pub fn auth_report(
    settings: Option<&Settings>,
    codex: &CodexStatus,
    api_key_set: bool,
) -> AuthReport {
    let (mode, note) = match settings {
        Some(settings) => match select_backend(settings, codex) {
            Ok(selection) => (selection.choice.as_str().to_string(), None),
            Err(err) => ("error".to_string(), Some(err.to_string())),
        },
        None => (
            "unknown".to_string(),
            Some("Failed to load config.".to_string()),
        ),
    };

    AuthReport {
        api_key_set,
        codex_installed: codex.codex_path.is_some(),
        npx_installed: codex.npx_path.is_some(),
        auth_exists: codex.auth_exists,
        auth_path: codex.auth_path.clone(),
        prefer_codex: settings.map(|settings| settings.prefer_codex),
        mode,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(codex: bool, npx: bool, auth: bool) -> CodexStatus {
        CodexStatus {
            codex_path: codex.then(|| PathBuf::from("/usr/bin/codex")),
            npx_path: npx.then(|| PathBuf::from("/usr/bin/npx")),
            auth_path: PathBuf::from("/home/dev/.codex/auth.json"),
            auth_exists: auth,
        }
    }

    fn with_key(key: Option<&str>, prefer_codex: bool) -> Settings {
        let mut settings = Settings::default();
        settings.api_key = key.map(str::to_string);
        settings.prefer_codex = prefer_codex;
        settings
    }

    #[test]
    fn test_select_prefers_codex_over_api_key() {
        let selection =
            select_backend(&with_key(Some("sk-test"), true), &status(true, true, true)).unwrap();
        assert_eq!(selection.choice, BackendChoice::Codex);
        assert_eq!(selection.reason, "prefer_codex is enabled");
    }

    #[test]
    fn test_select_api_key_wins_without_preference() {
        let selection =
            select_backend(&with_key(Some("sk-test"), false), &status(true, true, true)).unwrap();
        assert_eq!(selection.choice, BackendChoice::Api);
    }

    #[test]
    fn test_select_codex_when_no_key() {
        let selection = select_backend(&with_key(None, false), &status(true, false, true)).unwrap();
        assert_eq!(selection.choice, BackendChoice::Codex);
        assert_eq!(selection.reason, "codex CLI is installed and authenticated");
    }

    #[test]
    fn test_select_nothing_available() {
        let err = select_backend(&with_key(None, false), &status(false, false, false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "OPENAI_API_KEY is not set and Codex is not available. \
             Set OPENAI_API_KEY or run `npx @openai/codex@latest` to sign in."
        );
    }

    #[test]
    fn test_select_reports_which_codex_piece_is_missing() {
        let err = select_backend(&with_key(None, false), &status(true, true, false)).unwrap_err();
        assert!(err.to_string().contains("Codex is not signed in"));

        let err = select_backend(&with_key(None, false), &status(false, false, true)).unwrap_err();
        assert!(err.to_string().contains("Codex is not installed"));
    }

    #[test]
    fn test_prefer_codex_hard_errors() {
        let err = select_backend(&with_key(None, true), &status(false, false, false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Codex is not installed. Install Codex or run `npx @openai/codex@latest`."
        );

        let err = select_backend(&with_key(None, true), &status(true, false, false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Codex auth not found. Run `codex` or `npx @openai/codex@latest` to sign in."
        );
    }

    #[test]
    fn test_selection_is_deterministic() {
        let settings = with_key(Some("sk-test"), false);
        let codex = status(true, true, true);
        let first = select_backend(&settings, &codex).unwrap();
        for _ in 0..3 {
            assert_eq!(select_backend(&settings, &codex).unwrap(), first);
        }
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let selection = select_backend(&with_key(Some(""), false), &status(true, false, true)).unwrap();
        assert_eq!(selection.choice, BackendChoice::Codex);
    }

    #[test]
    fn test_auth_report_mirrors_selection() {
        let codex = status(true, false, true);
        let report = auth_report(Some(&with_key(Some("sk-test"), false)), &codex, true);
        assert_eq!(report.mode, "api");
        assert_eq!(report.note, None);
        assert!(report.codex_installed);
        assert!(!report.npx_installed);
        assert_eq!(report.prefer_codex, Some(false));

        let report = auth_report(Some(&with_key(None, false)), &status(false, false, false), false);
        assert_eq!(report.mode, "error");
        assert!(report.note.unwrap().contains("OPENAI_API_KEY is not set"));
    }

    #[test]
    fn test_auth_report_without_config() {
        let report = auth_report(None, &status(false, true, false), false);
        assert_eq!(report.mode, "unknown");
        assert_eq!(report.note.as_deref(), Some("Failed to load config."));
        assert_eq!(report.prefer_codex, None);
    }

    #[tokio::test]
    async fn test_run_backend_wraps_codex_failures() {
        let context = CommitContext {
            staged_files: vec!["src/lib.rs".to_string()],
            name_status: "M\tsrc/lib.rs".to_string(),
            diff_stat: String::new(),
            diff: cmtr_core::DiffContext::default(),
            log: cmtr_core::LogSample::default(),
            has_history: false,
        };
        let selection = Selection {
            choice: BackendChoice::Codex,
            reason: "codex CLI is installed and authenticated",
        };

        let err = run_backend(
            selection,
            &with_key(None, false),
            &status(false, false, false),
            Path::new("/repo"),
            &context,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Codex failed: Codex CLI not found in PATH. \
             Install/login to Codex or set OPENAI_API_KEY."
        );

        let err = run_backend(
            selection,
            &with_key(None, true),
            &status(false, false, false),
            Path::new("/repo"),
            &context,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Codex failed: Codex CLI not found in PATH. Install/login to Codex."
        );
    }
}
