//! cmtr-core: commit context engine
//!
//! Layer2 - everything between the git repository and the model backends
//!
//! # Modules
//!
//! - `git`: staged-change queries over the `git` CLI and porcelain parsers
//! - `context`: size-bounded diff and history sampling into a `CommitContext`
//! - `prompt`: system/user prompt assembly with XML-tagged sections
//! - `hook`: prepare-commit-msg hook install, skip rules, and message edits
//!
//! # Example
//!
//! ```ignore
//! use cmtr_core::{collect_context, GitOps};
//! use cmtr_foundation::Settings;
//!
//! let repo = GitOps::new(std::env::current_dir()?)?;
//! let settings = Settings::load(repo.root(), Default::default())?;
//! let context = collect_context(&repo, &settings)?;
//! let prompt = cmtr_core::build_user_prompt(&context);
//! ```

pub mod context;
pub mod git;
pub mod hook;
pub mod prompt;

// Re-exports: Context assembly
pub use context::{
    collect_context, CommitContext, DiffContext, ExcludedFile, FilePatch, LogEntry, LogSample,
};

// Re-exports: Git
pub use git::{
    parse_hooks_path_entries, parse_log_commits, parse_numstat, GitError, GitOps, HooksPathEntry,
    LogCommit, NumstatEntry, RepoReader,
};

// Re-exports: Hook lifecycle
pub use hook::{
    append_failure_comment, hook_state, install_hook, should_skip, uninstall_hook, write_message,
    HookState, SkipReason, HOOK_MARKER,
};

// Re-exports: Prompts
pub use prompt::{build_codex_prompt, build_system_prompt, build_user_prompt};

// Layer1 re-exports
pub use cmtr_foundation::{Error, Result, Settings};

/// Layer2 version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
