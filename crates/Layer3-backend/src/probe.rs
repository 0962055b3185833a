//! Codex CLI discovery
//!
//! A `CodexStatus` is a point-in-time snapshot of where the codex binary,
//! npx, and the auth credentials live. Selection and the status surface both
//! read from the same snapshot so they cannot disagree.

use std::path::PathBuf;

/// What the environment offers for running codex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodexStatus {
    /// Location of the `codex` binary, when on PATH
    pub codex_path: Option<PathBuf>,
    /// Location of `npx`, the fallback launcher
    pub npx_path: Option<PathBuf>,
    /// Where codex keeps its credentials
    pub auth_path: PathBuf,
    /// Whether the credential file exists
    pub auth_exists: bool,
}

impl CodexStatus {
    /// Probe PATH and the codex home directory
    pub fn detect() -> Self {
        let codex_path = which::which("codex").ok();
        let npx_path = which::which("npx").ok();
        let auth_path = codex_auth_path();
        let auth_exists = auth_path.exists();
        Self {
            codex_path,
            npx_path,
            auth_path,
            auth_exists,
        }
    }

    /// Some way to launch codex exists, signed in or not
    pub fn has_binary(&self) -> bool {
        self.codex_path.is_some() || self.npx_path.is_some()
    }

    /// Codex can actually generate: signed in and launchable
    pub fn is_available(&self) -> bool {
        self.auth_exists && self.has_binary()
    }

    /// Command used to invoke codex. A binary on PATH wins; npx is only
    /// worth trying once the user has signed in.
    pub fn command_prefix(&self) -> Option<Vec<String>> {
        if let Some(path) = &self.codex_path {
            return Some(vec![path.display().to_string()]);
        }
        if self.auth_exists {
            if let Some(path) = &self.npx_path {
                return Some(vec![
                    path.display().to_string(),
                    "-y".to_string(),
                    "@openai/codex@latest".to_string(),
                ]);
            }
        }
        None
    }
}

/// Path to codex's `auth.json`, honoring `CODEX_HOME`
pub fn codex_auth_path() -> PathBuf {
    auth_path_from(|var| std::env::var(var).ok())
}

fn auth_path_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    match lookup("CODEX_HOME") {
        Some(home) if !home.trim().is_empty() => PathBuf::from(home).join("auth.json"),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".codex")
            .join("auth.json"),
    }
}
