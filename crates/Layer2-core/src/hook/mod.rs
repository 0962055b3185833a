//! prepare-commit-msg hook lifecycle
//!
//! The installed hook is a tiny shell script identified by a marker comment.
//! Install and uninstall are idempotent and only ever touch the
//! marker-identified file; a hook cmtr did not write is never modified or
//! removed without `--force`. The skip predicate decides when the hook entry
//! point must leave the commit alone entirely.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use cmtr_foundation::{Error, Result};

/// Marker comment identifying a hook script written by cmtr
pub const HOOK_MARKER: &str = "# installed by cmtr (prepare-commit-msg)";

const HOOK_BASENAME: &str = "prepare-commit-msg";

/// Commit-source arguments for which git already has a message
const MESSAGE_SOURCES: &[&str] = &["message", "merge", "squash", "commit"];

fn hook_script() -> String {
    format!("#!/bin/sh\n{HOOK_MARKER}\nexec cmtr prepare-commit-msg \"$1\" \"$2\" \"$3\"\n")
}

// ============================================================================
// Hook state
// ============================================================================

/// What currently occupies the hook path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// No hook file exists
    Absent,
    /// A cmtr-marked hook is installed
    Installed,
    /// Some other hook occupies the path
    Foreign,
}

/// Inspect the `prepare-commit-msg` file under `hooks_dir`
pub fn hook_state(hooks_dir: &Path) -> Result<HookState> {
    let path = hooks_dir.join(HOOK_BASENAME);
    match fs::read_to_string(&path) {
        Ok(content) if content.contains(HOOK_MARKER) => Ok(HookState::Installed),
        Ok(_) => Ok(HookState::Foreign),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(HookState::Absent),
        Err(err) => Err(err.into()),
    }
}

/// Install the hook script. Reinstalling over our own hook refreshes it;
/// a foreign hook is only replaced with `force`.
pub fn install_hook(hooks_dir: &Path, force: bool) -> Result<PathBuf> {
    let path = hooks_dir.join(HOOK_BASENAME);
    if hook_state(hooks_dir)? == HookState::Foreign && !force {
        return Err(Error::HookConflict { path });
    }

    fs::create_dir_all(hooks_dir)?;
    fs::write(&path, hook_script())?;
    set_executable(&path)?;
    debug!("installed hook at {}", path.display());
    Ok(path)
}

/// Remove the hook script. Absent is a no-op success; a foreign hook is
/// left untouched and reported.
pub fn uninstall_hook(hooks_dir: &Path) -> Result<PathBuf> {
    let path = hooks_dir.join(HOOK_BASENAME);
    match hook_state(hooks_dir)? {
        HookState::Absent => Ok(path),
        HookState::Installed => {
            fs::remove_file(&path)?;
            debug!("removed hook at {}", path.display());
            Ok(path)
        }
        HookState::Foreign => Err(Error::HookConflict { path }),
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

// ============================================================================
// Skip predicate
// ============================================================================

/// Why the hook entry point left the commit alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Git was given a message already (`-m`, merge, squash, amend source)
    MessageProvided { source: String },
    /// The message file holds non-comment content (e.g. a reused message)
    TemplateHasContent,
    /// A rebase is replaying commits whose messages must survive
    RebaseInProgress,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MessageProvided { source } => {
                write!(f, "commit message already provided (source: {source})")
            }
            SkipReason::TemplateHasContent => {
                write!(f, "commit message file already has content")
            }
            SkipReason::RebaseInProgress => write!(f, "rebase in progress"),
        }
    }
}

/// Decide whether generation must be skipped for this hook invocation.
/// Never fails the commit: an unreadable message file just reads as empty.
pub fn should_skip(
    message_path: &Path,
    source: Option<&str>,
    git_dir: &Path,
) -> Option<SkipReason> {
    if let Some(source) = source {
        if MESSAGE_SOURCES.contains(&source) {
            return Some(SkipReason::MessageProvided {
                source: source.to_string(),
            });
        }
    }

    if git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists() {
        return Some(SkipReason::RebaseInProgress);
    }

    let content = fs::read_to_string(message_path).unwrap_or_default();
    let has_content = content
        .lines()
        .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'));
    if has_content {
        return Some(SkipReason::TemplateHasContent);
    }

    None
}

// ============================================================================
// Message file edits
// ============================================================================

/// Write the generated message into the commit message file, keeping any
/// existing template content below it.
pub fn write_message(message_path: &Path, message: &str) -> Result<()> {
    let existing = read_or_empty(message_path)?;
    let mut content = format!("{}\n", message.trim());
    if !existing.trim().is_empty() {
        content.push('\n');
        content.push_str(&existing);
    }
    fs::write(message_path, content)?;
    Ok(())
}

/// Append a `# cmtr failed: ...` comment so the user sees why no message
/// appeared, without ever blocking the commit.
pub fn append_failure_comment(message_path: &Path, reason: &str) -> Result<()> {
    let mut content = read_or_empty(message_path)?;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    let reason = reason.replace('\n', " ");
    content.push_str(&format!("# cmtr failed: {reason}\n"));
    fs::write(message_path, content)?;
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hooks_dir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let hooks = dir.path().join("hooks");
        (dir, hooks)
    }

    #[test]
    fn test_install_creates_marked_script() {
        let (_tmp, hooks) = hooks_dir();
        let path = install_hook(&hooks, false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh\n"));
        assert!(content.contains(HOOK_MARKER));
        assert!(content.contains("exec cmtr prepare-commit-msg"));
        assert_eq!(hook_state(&hooks).unwrap(), HookState::Installed);
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_hook_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let (_tmp, hooks) = hooks_dir();
        let path = install_hook(&hooks, false).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_install_is_idempotent() {
        let (_tmp, hooks) = hooks_dir();
        let first = install_hook(&hooks, false).unwrap();
        let second = install_hook(&hooks, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(hook_state(&hooks).unwrap(), HookState::Installed);
    }

    #[test]
    fn test_install_refuses_foreign_hook_without_force() {
        let (_tmp, hooks) = hooks_dir();
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("prepare-commit-msg"), "#!/bin/sh\nexit 0\n").unwrap();

        match install_hook(&hooks, false) {
            Err(Error::HookConflict { .. }) => {}
            other => panic!("expected HookConflict, got {other:?}"),
        }
        // The foreign hook is untouched.
        let content = fs::read_to_string(hooks.join("prepare-commit-msg")).unwrap();
        assert_eq!(content, "#!/bin/sh\nexit 0\n");
    }

    #[test]
    fn test_force_replaces_foreign_hook() {
        let (_tmp, hooks) = hooks_dir();
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("prepare-commit-msg"), "#!/bin/sh\nexit 0\n").unwrap();

        install_hook(&hooks, true).unwrap();
        assert_eq!(hook_state(&hooks).unwrap(), HookState::Installed);
    }

    #[test]
    fn test_uninstall_removes_only_our_hook() {
        let (_tmp, hooks) = hooks_dir();
        install_hook(&hooks, false).unwrap();
        uninstall_hook(&hooks).unwrap();
        assert_eq!(hook_state(&hooks).unwrap(), HookState::Absent);

        // Absent again: still a success.
        uninstall_hook(&hooks).unwrap();

        fs::write(hooks.join("prepare-commit-msg"), "#!/bin/sh\nexit 0\n").unwrap();
        match uninstall_hook(&hooks) {
            Err(Error::HookConflict { .. }) => {}
            other => panic!("expected HookConflict, got {other:?}"),
        }
        assert!(hooks.join("prepare-commit-msg").exists());
    }

    #[test]
    fn test_skip_when_source_already_has_message() {
        let (_tmp, hooks) = hooks_dir();
        let git_dir = hooks.join("gitdir");
        fs::create_dir_all(&git_dir).unwrap();
        let msg = hooks.join("COMMIT_EDITMSG");

        for source in ["message", "merge", "squash", "commit"] {
            let reason = should_skip(&msg, Some(source), &git_dir);
            assert_eq!(
                reason,
                Some(SkipReason::MessageProvided {
                    source: source.to_string()
                })
            );
        }

        // A template source still gets a generated message.
        assert_eq!(should_skip(&msg, Some("template"), &git_dir), None);
        assert_eq!(should_skip(&msg, None, &git_dir), None);
    }

    #[test]
    fn test_skip_during_rebase() {
        let (_tmp, hooks) = hooks_dir();
        let git_dir = hooks.join("gitdir");
        fs::create_dir_all(git_dir.join("rebase-merge")).unwrap();
        let msg = hooks.join("COMMIT_EDITMSG");

        assert_eq!(
            should_skip(&msg, None, &git_dir),
            Some(SkipReason::RebaseInProgress)
        );
    }

    #[test]
    fn test_comment_only_template_does_not_skip() {
        let (_tmp, hooks) = hooks_dir();
        let git_dir = hooks.join("gitdir");
        fs::create_dir_all(&git_dir).unwrap();
        let msg = hooks.join("COMMIT_EDITMSG");

        fs::write(&msg, "\n# Please enter the commit message\n#\n").unwrap();
        assert_eq!(should_skip(&msg, None, &git_dir), None);

        fs::write(&msg, "feat: reuse this message\n# comment\n").unwrap();
        assert_eq!(
            should_skip(&msg, None, &git_dir),
            Some(SkipReason::TemplateHasContent)
        );
    }

    #[test]
    fn test_write_message_keeps_template_below() {
        let (_tmp, hooks) = hooks_dir();
        fs::create_dir_all(&hooks).unwrap();
        let msg = hooks.join("COMMIT_EDITMSG");

        fs::write(&msg, "# Please enter the commit message\n").unwrap();
        write_message(&msg, "Add log sampler\n").unwrap();

        let content = fs::read_to_string(&msg).unwrap();
        assert_eq!(
            content,
            "Add log sampler\n\n# Please enter the commit message\n"
        );
    }

    #[test]
    fn test_write_message_into_empty_file() {
        let (_tmp, hooks) = hooks_dir();
        fs::create_dir_all(&hooks).unwrap();
        let msg = hooks.join("COMMIT_EDITMSG");
        fs::write(&msg, "\n").unwrap();

        write_message(&msg, "Fix parser").unwrap();
        assert_eq!(fs::read_to_string(&msg).unwrap(), "Fix parser\n");
    }

    #[test]
    fn test_append_failure_comment() {
        let (_tmp, hooks) = hooks_dir();
        fs::create_dir_all(&hooks).unwrap();
        let msg = hooks.join("COMMIT_EDITMSG");
        fs::write(&msg, "# template").unwrap();

        append_failure_comment(&msg, "No staged changes found.\nStage files first.").unwrap();

        let content = fs::read_to_string(&msg).unwrap();
        assert_eq!(
            content,
            "# template\n# cmtr failed: No staged changes found. Stage files first.\n"
        );
    }
}
