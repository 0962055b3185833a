//! Git Integration Module
//!
//! Subprocess-backed repository access:
//! - Staged state: name-only, name-status, stat, numstat, per-file patches
//! - History: recent commits with subjects, bodies, and touched paths
//! - Plumbing: repo root discovery, hooks directory, `core.hooksPath` origins

pub mod ops;

pub use ops::{
    parse_hooks_path_entries, parse_log_commits, parse_numstat, GitError, GitOps, HooksPathEntry,
    LogCommit, NumstatEntry, RepoReader,
};
