//! Codex CLI adapter
//!
//! Runs `codex exec` as a subprocess with the prompt on stdin and a JSON
//! output schema, falling back to `npx` when the binary is not installed.
//! The child is killed if it outlives `timeout_seconds`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use cmtr_core::{build_codex_prompt, build_system_prompt, build_user_prompt, CommitContext};
use cmtr_foundation::Settings;

use crate::adapters::effective_timeout;
use crate::error::BackendError;
use crate::message::GeneratedMessage;
use crate::probe::CodexStatus;
use crate::r#trait::Backend;

/// Codex serves its own model family; the configured API model is not used.
pub const DEFAULT_CODEX_MODEL: &str = "gpt-5.2-codex";

/// Backend that shells out to the codex CLI
pub struct CodexBackend {
    status: CodexStatus,
    root: PathBuf,
}

impl CodexBackend {
    pub fn new(status: CodexStatus, root: impl Into<PathBuf>) -> Self {
        Self {
            status,
            root: root.into(),
        }
    }
}

#[async_trait]
impl Backend for CodexBackend {
    fn name(&self) -> &'static str {
        "codex"
    }

    async fn generate(
        &self,
        context: &CommitContext,
        settings: &Settings,
    ) -> Result<GeneratedMessage, BackendError> {
        let Some(prefix) = self.status.command_prefix() else {
            if self.status.auth_exists {
                return Err(BackendError::codex(
                    "Codex CLI not found and npx is unavailable.",
                ));
            }
            return Err(BackendError::codex("Codex CLI not found in PATH."));
        };

        let schema_file = tempfile::Builder::new()
            .prefix("cmtr_schema_")
            .tempfile()
            .map_err(|err| BackendError::codex(format!("Failed to run Codex CLI: {err}")))?;
        serde_json::to_writer(schema_file.as_file(), &output_schema())
            .map_err(|err| BackendError::codex(format!("Failed to run Codex CLI: {err}")))?;

        // Codex writes the structured result here; kept alive until read.
        let output_file = tempfile::Builder::new()
            .prefix("cmtr_codex_")
            .tempfile()
            .map_err(|err| BackendError::codex(format!("Failed to run Codex CLI: {err}")))?;

        let args = exec_args(
            DEFAULT_CODEX_MODEL,
            schema_file.path(),
            output_file.path(),
            &self.root,
        );
        let mut command = Command::new(&prefix[0]);
        command
            .args(&prefix[1..])
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let is_set = |var: &str| std::env::var_os(var).is_some();
        for (var, value) in env_overrides(settings.api_key.as_deref(), &self.status, is_set) {
            command.env(var, value);
        }

        debug!(launcher = %prefix[0], "running codex exec");
        let mut child = command
            .spawn()
            .map_err(|err| BackendError::codex(format!("Failed to run Codex CLI: {err}")))?;

        let prompt = build_codex_prompt(build_system_prompt(), &build_user_prompt(context));
        // One deadline covers the stdin write and the wait: a child that
        // never drains its pipe would otherwise block the write forever
        // once the prompt outgrows the pipe buffer.
        let run = async {
            if let Some(mut stdin) = child.stdin.take() {
                match stdin.write_all(prompt.as_bytes()).await {
                    Ok(()) => {}
                    // A fast-failing codex closes the pipe early; the exit
                    // status below carries the real diagnostics.
                    Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                    Err(err) => return Err(err),
                }
                // stdin drops here, closing the pipe so codex sees EOF.
            }
            child.wait_with_output().await
        };

        let output = match effective_timeout(settings.timeout_seconds) {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                // Dropping the timed-out future kills the child.
                Err(_) => {
                    return Err(BackendError::Timeout {
                        seconds: settings.timeout_seconds,
                    });
                }
            },
            None => run.await,
        }
        .map_err(|err| BackendError::codex(format!("Failed to run Codex CLI: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diagnostic = match (stderr.trim(), stdout.trim()) {
                ("", "") => "Codex exec failed",
                ("", out) => out,
                (err, _) => err,
            };
            return Err(BackendError::codex(diagnostic));
        }

        let raw = tokio::fs::read_to_string(output_file.path())
            .await
            .map_err(|err| BackendError::codex(format!("Failed to read Codex output: {err}")))?;

        let message = extract_message(&raw).ok_or_else(|| {
            BackendError::codex("Codex output did not contain a commit message.")
        })?;
        GeneratedMessage::from_raw(&message)
            .ok_or_else(|| BackendError::codex("Codex output did not contain a commit message."))
    }
}

fn output_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {"message": {"type": "string"}},
        "required": ["message"],
        "additionalProperties": false,
    })
}

fn exec_args(model: &str, schema: &Path, output: &Path, root: &Path) -> Vec<String> {
    vec![
        "exec".to_string(),
        "--model".to_string(),
        model.to_string(),
        "--output-schema".to_string(),
        schema.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
        "--color".to_string(),
        "never".to_string(),
        "--sandbox".to_string(),
        "read-only".to_string(),
        "-C".to_string(),
        root.display().to_string(),
        "-".to_string(),
    ]
}

/// Environment additions for the child, never overriding what the user
/// already exported
fn env_overrides(
    api_key: Option<&str>,
    status: &CodexStatus,
    is_set: impl Fn(&str) -> bool,
) -> Vec<(&'static str, String)> {
    let mut vars = Vec::new();
    if let Some(key) = api_key {
        if !key.is_empty() && !status.auth_exists && !is_set("CODEX_API_KEY") {
            vars.push(("CODEX_API_KEY", key.to_string()));
        }
    }
    if status.auth_exists && !is_set("CODEX_HOME") {
        if let Some(home) = status.auth_path.parent() {
            vars.push(("CODEX_HOME", home.display().to_string()));
        }
    }
    vars
}

/// Pull `message` out of the schema-constrained JSON codex wrote
fn extract_message(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let message = value.as_object()?.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
