//! Hidden `prepare-commit-msg` entry point invoked by the installed hook.

use std::path::Path;

use cmtr_backend::{run_backend, select_backend, BackendChoice, CodexStatus};
use cmtr_core::{append_failure_comment, collect_context, should_skip, write_message, GitOps};
use cmtr_foundation::{Result, Settings, SettingsPatch};
use tracing::debug;

/// Never blocks the commit: every failure is downgraded to a template
/// comment plus a stderr line, and the exit code is always zero.
pub async fn run_prepare_commit_msg(
    message_path: &Path,
    source: Option<&str>,
    _sha: Option<&str>,
    overrides: &SettingsPatch,
) -> i32 {
    if let Err(err) = generate(message_path, source, overrides).await {
        let _ = append_failure_comment(message_path, &err.to_string());
        eprintln!("cmtr error: {err}");
    }
    0
}

async fn generate(
    message_path: &Path,
    source: Option<&str>,
    overrides: &SettingsPatch,
) -> Result<()> {
    let repo = GitOps::new(std::env::current_dir()?)?;

    // Merges, amends, supplied messages and rebases keep their own text;
    // checked before anything else so those commits stay silent.
    if let Some(reason) = should_skip(message_path, source, &repo.git_dir()?) {
        debug!("skipping generation: {reason}");
        return Ok(());
    }

    let settings = Settings::load(repo.root(), overrides.clone())?;
    let codex = CodexStatus::detect();
    let selection = select_backend(&settings, &codex)?;
    match selection.choice {
        BackendChoice::Codex => eprintln!("Generating commit message (codex)..."),
        BackendChoice::Api => eprintln!("Generating commit message..."),
    }

    let context = collect_context(&repo, &settings)?;
    let message = run_backend(selection, &settings, &codex, repo.root(), &context).await?;
    write_message(message_path, message.as_str())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // Outside a repository the hook still exits zero and leaves its
    // diagnosis in the message file.
    #[tokio::test]
    async fn test_failure_is_reported_as_comment_and_exit_zero() {
        let dir = tempfile::tempdir().unwrap();
        let message_path = dir.path().join("COMMIT_EDITMSG");
        fs::write(&message_path, "").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let code =
            run_prepare_commit_msg(&message_path, None, None, &SettingsPatch::default()).await;
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(code, 0);
        let content = fs::read_to_string(&message_path).unwrap();
        assert!(content.contains("# cmtr failed:"), "got: {content:?}");
    }
}
