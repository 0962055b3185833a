//! Commit-history sampling for style examples
//!
//! Recent commits touching the staged paths are collected so the model can
//! mirror the repository's own message conventions. Every budget applies at
//! parse time: entry count, tagged paths per entry, and body lines per entry
//! (the subject is always kept and never counted against the body cap).

use std::collections::HashSet;

use cmtr_foundation::Settings;

use crate::git::{GitError, RepoReader};

use super::diff::is_lockfile;

/// One sampled commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Commit subject line
    pub subject: String,

    /// Body lines, capped at `max_log_body_lines`
    pub body_lines: Vec<String>,

    /// Paths this commit shares with the staged diff, capped at
    /// `max_log_paths`
    pub paths: Vec<String>,
}

/// Sampled history; empty is a valid state for repositories with no commits
/// on any shared path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSample {
    pub entries: Vec<LogEntry>,
}

impl LogSample {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sample history for the staged paths. When the diff sampler filtered
    /// out lockfiles, those paths are not queried either, so examples stay
    /// about the content the prompt will actually show.
    pub fn gather(
        repo: &impl RepoReader,
        staged: &[String],
        diff_filtered: bool,
        settings: &Settings,
    ) -> Result<Self, GitError> {
        if settings.max_log_entries == 0 || settings.max_log_paths == 0 {
            return Ok(LogSample::default());
        }

        let mut query: Vec<String> = if diff_filtered {
            staged
                .iter()
                .filter(|path| !is_lockfile(path))
                .cloned()
                .collect()
        } else {
            staged.to_vec()
        };
        if query.is_empty() {
            query = staged.to_vec();
        }

        let commits = repo.recent_commits(settings.max_log_entries, &query)?;
        let shared: HashSet<&str> = query.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for commit in commits {
            // Repeated subject+body pairs (e.g. "wip" commits) add nothing.
            if !seen.insert((commit.subject.clone(), commit.body.clone())) {
                continue;
            }

            let body_lines: Vec<String> = commit
                .body
                .lines()
                .map(|line| line.trim_end().to_string())
                .take(settings.max_log_body_lines)
                .collect();

            let paths: Vec<String> = commit
                .paths
                .iter()
                .filter(|path| shared.contains(path.as_str()))
                .take(settings.max_log_paths)
                .cloned()
                .collect();

            entries.push(LogEntry {
                subject: commit.subject,
                body_lines,
                paths,
            });
            if entries.len() == settings.max_log_entries {
                break;
            }
        }

        Ok(LogSample { entries })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::testing::FakeRepo;
    use super::*;
    use crate::git::LogCommit;

    fn commit(subject: &str, body: &str, paths: &[&str]) -> LogCommit {
        LogCommit {
            subject: subject.to_string(),
            body: body.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn staged(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_gather_caps_paths_and_body_lines() {
        let settings = Settings {
            max_log_paths: 2,
            max_log_body_lines: 2,
            ..Settings::default()
        };
        let repo = FakeRepo::new().commits(vec![commit(
            "Add parser",
            "line one\nline two\nline three",
            &["a.rs", "b.rs", "c.rs"],
        )]);

        let sample = LogSample::gather(
            &repo,
            &staged(&["a.rs", "b.rs", "c.rs"]),
            false,
            &settings,
        )
        .unwrap();

        assert_eq!(sample.entries.len(), 1);
        let entry = &sample.entries[0];
        assert_eq!(entry.subject, "Add parser");
        assert_eq!(entry.body_lines, vec!["line one", "line two"]);
        assert_eq!(entry.paths, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn test_gather_tags_only_shared_paths() {
        let repo = FakeRepo::new().commits(vec![commit(
            "Touches other areas too",
            "",
            &["shared.rs", "unrelated/infra.tf"],
        )]);

        let sample = LogSample::gather(&repo, &staged(&["shared.rs"]), false, &Settings::default())
            .unwrap();

        assert_eq!(sample.entries[0].paths, vec!["shared.rs"]);
    }

    #[test]
    fn test_gather_deduplicates_repeated_messages() {
        let repo = FakeRepo::new().commits(vec![
            commit("wip", "", &["a.rs"]),
            commit("wip", "", &["a.rs"]),
            commit("Real change", "with body", &["a.rs"]),
        ]);

        let sample =
            LogSample::gather(&repo, &staged(&["a.rs"]), false, &Settings::default()).unwrap();

        let subjects: Vec<&str> = sample.entries.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["wip", "Real change"]);
    }

    #[test]
    fn test_gather_respects_entry_cap() {
        let settings = Settings {
            max_log_entries: 2,
            ..Settings::default()
        };
        let repo = FakeRepo::new().commits(vec![
            commit("one", "", &["a.rs"]),
            commit("two", "", &["a.rs"]),
            commit("three", "", &["a.rs"]),
        ]);

        let sample = LogSample::gather(&repo, &staged(&["a.rs"]), false, &settings).unwrap();
        assert_eq!(sample.entries.len(), 2);
    }

    #[test]
    fn test_gather_skips_lockfile_paths_when_diff_was_filtered() {
        let repo = FakeRepo::new().commits(vec![commit("c", "", &["src/lib.rs"])]);

        let _ = LogSample::gather(
            &repo,
            &staged(&["src/lib.rs", "Cargo.lock"]),
            true,
            &Settings::default(),
        )
        .unwrap();

        let queries = repo.log_queries.borrow();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], vec!["src/lib.rs"]);
    }

    #[test]
    fn test_gather_falls_back_to_all_staged_when_filter_empties_query() {
        let repo = FakeRepo::new();

        let sample = LogSample::gather(
            &repo,
            &staged(&["Cargo.lock"]),
            true,
            &Settings::default(),
        )
        .unwrap();

        assert!(sample.is_empty());
        let queries = repo.log_queries.borrow();
        assert_eq!(queries[0], vec!["Cargo.lock"]);
    }

    #[test]
    fn test_gather_zero_budgets_skip_the_query() {
        let settings = Settings {
            max_log_entries: 0,
            ..Settings::default()
        };
        let repo = FakeRepo::new().commits(vec![commit("never seen", "", &["a.rs"])]);

        let sample = LogSample::gather(&repo, &staged(&["a.rs"]), false, &settings).unwrap();
        assert!(sample.is_empty());
        assert!(repo.log_queries.borrow().is_empty());
    }

    #[test]
    fn test_empty_history_is_a_valid_state() {
        let repo = FakeRepo::new();
        let sample =
            LogSample::gather(&repo, &staged(&["a.rs"]), false, &Settings::default()).unwrap();
        assert!(sample.is_empty());
    }
}
