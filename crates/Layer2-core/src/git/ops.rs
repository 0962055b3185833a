//! Git Operations
//!
//! Every repository question cmtr asks goes through one `git` subprocess
//! wrapper. Parsers for the porcelain formats live here too, separated from
//! process handling so they can be tested on captured output.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("{0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GitError> for cmtr_foundation::Error {
    fn from(err: GitError) -> Self {
        cmtr_foundation::Error::Git(err.to_string())
    }
}

// ============================================================================
// Parsed Output Types
// ============================================================================

/// One entry of `git diff --cached --numstat -z`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    /// Path on the staged side (the new path for renames)
    pub path: String,

    /// Added line count, `None` for binary files
    pub added: Option<u64>,

    /// Deleted line count, `None` for binary files
    pub deleted: Option<u64>,

    /// Previous path when the entry records a rename
    pub path_before: Option<String>,
}

impl NumstatEntry {
    /// Whether git reported the file as binary
    pub fn is_binary(&self) -> bool {
        self.added.is_none() || self.deleted.is_none()
    }

    /// Total changed lines, zero for binary files
    pub fn changed_lines(&self) -> u64 {
        self.added.unwrap_or(0) + self.deleted.unwrap_or(0)
    }
}

/// One commit parsed from `git log --name-only`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCommit {
    pub subject: String,
    pub body: String,
    pub paths: Vec<String>,
}

/// One `core.hooksPath` setting with the config file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HooksPathEntry {
    pub origin: String,
    pub path: String,
}

// ============================================================================
// Repository Reader
// ============================================================================

/// Read-only repository queries the context sampler needs. `GitOps` is the
/// real implementation; tests substitute canned data.
pub trait RepoReader {
    /// Staged paths, in git's order
    fn staged_files(&self) -> Result<Vec<String>, GitError>;

    /// `git diff --cached --name-status` output
    fn name_status(&self) -> Result<String, GitError>;

    /// `git diff --cached --stat` output
    fn diff_stat(&self) -> Result<String, GitError>;

    /// Staged patch text, restricted to `paths` unless it is empty
    fn diff_patch(&self, paths: &[String]) -> Result<String, GitError>;

    /// Per-file added/deleted counts for the staged diff
    fn diff_numstat(&self) -> Result<Vec<NumstatEntry>, GitError>;

    /// Whether HEAD resolves to a commit
    fn has_commits(&self) -> Result<bool, GitError>;

    /// Up to `max` recent commits touching `paths` (all commits when empty)
    fn recent_commits(&self, max: usize, paths: &[String]) -> Result<Vec<LogCommit>, GitError>;
}

// ============================================================================
// Git Operations
// ============================================================================

/// Markers injected into the log pretty-format so multi-line bodies and the
/// trailing file list can be split apart again.
const COMMIT_MARKER: &str = "----COMMIT----";
const FILES_MARKER: &str = "----FILES----";

/// Git operations handler for one repository
#[derive(Debug)]
pub struct GitOps {
    /// Repository root directory
    root: PathBuf,
}

impl GitOps {
    /// Create GitOps for the repository containing `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let root = Self::find_git_root(path.as_ref())?;
        Ok(Self { root })
    }

    /// Find the repository root by walking up until `.git` appears.
    /// Worktrees keep a `.git` file instead of a directory, so only
    /// existence is checked.
    fn find_git_root(path: &Path) -> Result<PathBuf, GitError> {
        let mut current = if path.is_file() {
            path.parent().unwrap_or(path).to_path_buf()
        } else {
            path.to_path_buf()
        };

        loop {
            if current.join(".git").exists() {
                return Ok(current);
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                return Err(GitError::NotARepository(path.to_path_buf()));
            }
        }
    }

    /// Get repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git command in the repository root.
    ///
    /// Failure reports stderr when git wrote any, otherwise stdout, so
    /// messages like `fatal: not a git repository` survive intact.
    fn run_git<I, S>(&self, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let message = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                "Unknown git error".to_string()
            };
            Err(GitError::CommandFailed(message))
        }
    }

    /// Resolve a path printed by `rev-parse --git-path` or `--git-dir`,
    /// which is relative to the repository root when not absolute.
    fn resolve_repo_path(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw.trim());
        if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        }
    }

    /// The `.git` directory (or worktree equivalent)
    pub fn git_dir(&self) -> Result<PathBuf, GitError> {
        let raw = self.run_git(["rev-parse", "--git-dir"])?;
        Ok(self.resolve_repo_path(&raw))
    }

    /// Directory git consults for hooks, honoring `core.hooksPath`
    pub fn hooks_dir(&self) -> Result<PathBuf, GitError> {
        let raw = self.run_git(["rev-parse", "--git-path", "hooks"])?;
        Ok(self.resolve_repo_path(&raw))
    }

    /// All `core.hooksPath` settings with their config origins. Empty when
    /// the key is unset, which git reports as a failing exit.
    pub fn hooks_path_overrides(&self) -> Result<Vec<HooksPathEntry>, GitError> {
        match self.run_git(["config", "--show-origin", "--get-all", "core.hooksPath"]) {
            Ok(output) => Ok(parse_hooks_path_entries(&output)),
            Err(GitError::CommandFailed(_)) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

impl RepoReader for GitOps {
    fn staged_files(&self) -> Result<Vec<String>, GitError> {
        let output = self.run_git(["diff", "--cached", "--name-only", "-z"])?;
        Ok(output
            .split('\0')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn name_status(&self) -> Result<String, GitError> {
        let output = self.run_git(["diff", "--cached", "--name-status"])?;
        Ok(output.trim().to_string())
    }

    fn diff_stat(&self) -> Result<String, GitError> {
        let output = self.run_git(["diff", "--cached", "--stat"])?;
        Ok(output.trim().to_string())
    }

    fn diff_patch(&self, paths: &[String]) -> Result<String, GitError> {
        let mut args: Vec<&OsStr> = vec!["diff".as_ref(), "--cached".as_ref()];
        if !paths.is_empty() {
            args.push("--".as_ref());
            args.extend(paths.iter().map(|p| -> &OsStr { p.as_ref() }));
        }
        self.run_git(args)
    }

    fn diff_numstat(&self) -> Result<Vec<NumstatEntry>, GitError> {
        let output = self.run_git(["diff", "--cached", "--numstat", "-z"])?;
        parse_numstat(&output)
    }

    fn has_commits(&self) -> Result<bool, GitError> {
        match self.run_git(["rev-parse", "--verify", "HEAD"]) {
            Ok(_) => Ok(true),
            Err(GitError::CommandFailed(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn recent_commits(&self, max: usize, paths: &[String]) -> Result<Vec<LogCommit>, GitError> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let max_count = format!("--max-count={max}");
        let pretty = format!("--pretty=format:{COMMIT_MARKER}%n%s%n%b%n{FILES_MARKER}");
        let mut args: Vec<&OsStr> = vec![
            "log".as_ref(),
            max_count.as_ref(),
            "--name-only".as_ref(),
            pretty.as_ref(),
        ];
        if !paths.is_empty() {
            args.push("--".as_ref());
            args.extend(paths.iter().map(|p| -> &OsStr { p.as_ref() }));
        }

        match self.run_git(args) {
            Ok(output) => Ok(parse_log_commits(&output)),
            Err(GitError::CommandFailed(message)) => {
                // An unborn branch or a pathspec matching nothing is not
                // worth failing the whole run over.
                debug!("git log unavailable: {message}");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// Output Parsers
// ============================================================================

/// Parse NUL-separated `--numstat -z` output. Renames leave the header path
/// empty and append the two paths as separate NUL-terminated fields.
pub fn parse_numstat(output: &str) -> Result<Vec<NumstatEntry>, GitError> {
    let parts: Vec<&str> = output.split('\0').collect();
    let mut entries = Vec::new();
    let mut index = 0;

    while index < parts.len() {
        let header = parts[index];
        index += 1;
        if header.is_empty() {
            continue;
        }

        let fields: Vec<&str> = header.split('\t').collect();
        if fields.len() < 3 {
            return Err(GitError::CommandFailed(format!(
                "unexpected numstat entry: {header:?}"
            )));
        }

        let added = parse_count(fields[0], header)?;
        let deleted = parse_count(fields[1], header)?;
        let mut path = fields[2].to_string();
        let mut path_before = None;

        if path.is_empty() {
            // Rename record: the next two fields are the old and new path.
            if index + 1 >= parts.len() {
                return Err(GitError::CommandFailed(format!(
                    "truncated numstat rename entry: {header:?}"
                )));
            }
            path_before = Some(parts[index].to_string());
            path = parts[index + 1].to_string();
            index += 2;
        }

        entries.push(NumstatEntry {
            path,
            added,
            deleted,
            path_before,
        });
    }

    Ok(entries)
}

fn parse_count(raw: &str, header: &str) -> Result<Option<u64>, GitError> {
    if raw == "-" {
        return Ok(None);
    }
    raw.parse::<u64>().map(Some).map_err(|_| {
        GitError::CommandFailed(format!("unexpected numstat entry: {header:?}"))
    })
}

/// Parse marker-delimited `git log --name-only` output into commits
pub fn parse_log_commits(output: &str) -> Vec<LogCommit> {
    let mut commits = Vec::new();

    for chunk in output.split(COMMIT_MARKER) {
        let chunk = chunk.trim_matches('\n');
        if chunk.is_empty() {
            continue;
        }

        let mut lines = chunk.lines();
        let subject = match lines.next() {
            Some(line) => line.trim().to_string(),
            None => continue,
        };

        let mut body_lines = Vec::new();
        let mut paths = Vec::new();
        let mut in_files = false;
        for line in lines {
            if line.trim() == FILES_MARKER {
                in_files = true;
                continue;
            }
            if in_files {
                if !line.trim().is_empty() {
                    paths.push(line.trim().to_string());
                }
            } else {
                body_lines.push(line.trim_end());
            }
        }

        let body = body_lines.join("\n").trim().to_string();
        if subject.is_empty() && body.is_empty() {
            continue;
        }

        commits.push(LogCommit {
            subject,
            body,
            paths,
        });
    }

    commits
}

/// Parse `git config --show-origin` lines into hooksPath entries. Both the
/// tab-separated and the space-separated `key = value` shapes appear in the
/// wild, and the key match is case-insensitive.
pub fn parse_hooks_path_entries(output: &str) -> Vec<HooksPathEntry> {
    const KEY: &str = "core.hookspath";

    let mut entries = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(split_at) = line.find(|c: char| c.is_whitespace()) else {
            continue;
        };
        let origin = line[..split_at].to_string();
        let rest = line[split_at..].trim_start();

        let is_key = rest
            .get(..KEY.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(KEY));
        if !is_key {
            continue;
        }
        let mut value = rest[KEY.len()..].trim_start();
        if let Some(stripped) = value.strip_prefix('=') {
            value = stripped.trim_start();
        }
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        entries.push(HooksPathEntry {
            origin,
            path: value.to_string(),
        });
    }

    entries
}

// ============================================================================
// Tests
// ============================================================================
