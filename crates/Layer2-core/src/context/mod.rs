//! Bounded context sampling
//!
//! One pass over the repository gathers everything the prompt needs: staged
//! file summaries, the budgeted diff, and history examples. Identical
//! repository state and settings always produce identical output.

mod diff;
mod log;

pub use diff::{DiffContext, ExcludedFile, FilePatch};
pub use log::{LogEntry, LogSample};

use cmtr_foundation::{Error, Result, Settings};

use crate::git::RepoReader;

/// Everything sampled for one generation run
#[derive(Debug, Clone)]
pub struct CommitContext {
    /// Staged paths in git order
    pub staged_files: Vec<String>,

    /// `--name-status` summary shown to the model
    pub name_status: String,

    /// `--stat` summary shown to the model
    pub diff_stat: String,

    /// Filtered, budgeted diff
    pub diff: DiffContext,

    /// Style examples from history
    pub log: LogSample,

    /// Whether HEAD exists; drives the no-history prompt fallback
    pub has_history: bool,
}

/// Sample the repository for one run. An empty staged set is fatal for the
/// run and reported as such, not as a sampler failure.
pub fn collect_context(repo: &impl RepoReader, settings: &Settings) -> Result<CommitContext> {
    let staged_files = repo.staged_files()?;
    if staged_files.is_empty() {
        return Err(Error::NoStagedChanges);
    }

    let name_status = repo.name_status()?;
    let diff_stat = repo.diff_stat()?;
    let diff = DiffContext::build(repo, settings)?;
    let has_history = repo.has_commits()?;
    let log = if has_history {
        LogSample::gather(repo, &staged_files, diff.filtered, settings)?
    } else {
        LogSample::default()
    };

    Ok(CommitContext {
        staged_files,
        name_status,
        diff_stat,
        diff,
        log,
        has_history,
    })
}

// ============================================================================
// Test double
// ============================================================================


// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::testing::FakeRepo;
    use super::*;
    use crate::git::NumstatEntry;

    #[test]
    fn test_collect_context_fails_on_empty_staged_set() {
        let repo = FakeRepo::new().staged(Vec::new());
        match collect_context(&repo, &Settings::default()) {
            Err(Error::NoStagedChanges) => {}
            other => panic!("expected NoStagedChanges, got {other:?}"),
        }
    }

    #[test]
    fn test_collect_context_assembles_all_sections() {
        let repo = FakeRepo::new()
            .numstat(vec![NumstatEntry {
                path: "src/lib.rs".to_string(),
                added: Some(2),
                deleted: Some(1),
                path_before: None,
            }])
            .patch("src/lib.rs", "diff --git a/src/lib.rs\n+pub fn x() {}");

        let context = collect_context(&repo, &Settings::default()).unwrap();

        assert_eq!(context.staged_files, vec!["src/lib.rs"]);
        assert_eq!(context.name_status, "M\tsrc/lib.rs");
        assert!(context.diff.text.contains("pub fn x()"));
        assert!(context.has_history);
    }

    #[test]
    fn test_collect_context_skips_history_for_unborn_head() {
        let repo = FakeRepo::new().history(false);
        let context = collect_context(&repo, &Settings::default()).unwrap();

        assert!(!context.has_history);
        assert!(context.log.is_empty());
        // No log query is even attempted without a commit to read.
        assert!(repo.log_queries.borrow().is_empty());
    }
}
