//! Staged diff assembly under size budgets
//!
//! The staged diff is rebuilt file by file from numstat so noisy files can be
//! dropped with a recorded reason instead of silently vanishing. Inclusion
//! runs in git's natural order under three budgets: rendered lines
//! (`max_patch_lines`), rendered bytes (`max_diff_bytes`), and an estimated
//! token count. The first file that no longer fits is cut at a line boundary,
//! everything after it is excluded, and the truncation flag records the cut.

use tracing::debug;

use cmtr_foundation::Settings;

use crate::git::{GitError, NumstatEntry, RepoReader};

/// Lockfile basenames never worth showing to a model
const LOCKFILE_BASENAMES: &[&str] = &[
    "bun.lockb",
    "Cargo.lock",
    "composer.lock",
    "Gemfile.lock",
    "go.sum",
    "go.work.sum",
    "mix.lock",
    "npm-shrinkwrap.json",
    "package-lock.json",
    "Package.resolved",
    "Pipfile.lock",
    "pnpm-lock.yaml",
    "pnpm-lock.yml",
    "poetry.lock",
    "pdm.lock",
    "pubspec.lock",
    "uv.lock",
    "yarn.lock",
];

/// Cap on listed exclusions in the rendered note
const MAX_EXCLUDED_LISTED: usize = 50;

/// Rough token estimate: about four characters per token
const CHARS_PER_TOKEN: usize = 4;

// ============================================================================
// Types
// ============================================================================

/// One file's patch kept in the rendered diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub path: String,
    pub body: String,
}

/// One file left out of the rendered diff, with the reason shown in the note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedFile {
    pub path: String,
    pub reason: String,
}

/// The staged diff after filtering and budgeting
#[derive(Debug, Clone, Default)]
pub struct DiffContext {
    /// Included per-file patches, in git order
    pub patches: Vec<FilePatch>,

    /// Files excluded from the rendered diff
    pub excluded: Vec<ExcludedFile>,

    /// Rendered diff text, including the exclusion note
    pub text: String,

    /// Set when any patch content was cut by a budget
    pub truncated: bool,

    /// Set when any file was excluded outright
    pub filtered: bool,
}

impl DiffContext {
    /// Build the diff context for the staged changes
    pub fn build(repo: &impl RepoReader, settings: &Settings) -> Result<Self, GitError> {
        build_diff(repo, settings)
    }
}

/// Whether `path` names a lockfile by basename
pub(crate) fn is_lockfile(path: &str) -> bool {
    let basename = path.rsplit('/').next().unwrap_or(path);
    LOCKFILE_BASENAMES.contains(&basename)
}

// ============================================================================
// Assembly
// ============================================================================

struct Budget {
    lines: usize,
    bytes: usize,
    tokens: usize,
}

impl Budget {
    fn new(settings: &Settings) -> Self {
        Self {
            lines: cap_or_max(settings.max_patch_lines),
            bytes: cap_or_max(settings.max_diff_bytes),
            tokens: cap_or_max(estimate_tokens_for_len(settings.max_diff_bytes)),
        }
    }

    fn fits(&self, lines: usize, bytes: usize, tokens: usize) -> bool {
        lines <= self.lines && bytes <= self.bytes && tokens <= self.tokens
    }

    fn consume(&mut self, lines: usize, bytes: usize, tokens: usize) {
        self.lines -= lines;
        self.bytes -= bytes;
        self.tokens -= tokens;
    }

    /// Largest byte allowance still honoring both the byte and token budgets
    fn remaining_bytes(&self) -> usize {
        self.bytes.min(self.tokens.saturating_mul(CHARS_PER_TOKEN))
    }
}

fn cap_or_max(cap: usize) -> usize {
    if cap == 0 {
        usize::MAX
    } else {
        cap
    }
}

fn estimate_tokens(text: &str) -> usize {
    estimate_tokens_for_len(text.len())
}

fn estimate_tokens_for_len(len: usize) -> usize {
    len.div_ceil(CHARS_PER_TOKEN)
}

fn build_diff(repo: &impl RepoReader, settings: &Settings) -> Result<DiffContext, GitError> {
    let entries = repo.diff_numstat()?;
    if entries.is_empty() {
        // Rare but possible (e.g. mode-only changes): keep the raw diff.
        let raw = repo.diff_patch(&[])?;
        let (text, truncated) =
            truncate_text(raw.trim(), settings.max_patch_lines, settings.max_diff_bytes);
        return Ok(DiffContext {
            patches: Vec::new(),
            excluded: Vec::new(),
            text,
            truncated,
            filtered: false,
        });
    }

    let mut excluded = Vec::new();
    let mut candidates = Vec::new();
    for entry in entries {
        if is_lockfile(&entry.path) {
            exclude(&mut excluded, &entry, "excluded lock file".to_string());
        } else if entry.is_binary() {
            exclude(&mut excluded, &entry, "binary file".to_string());
        } else {
            candidates.push(entry);
        }
    }

    // When the staged change is larger than the whole line budget, files that
    // dominate it are dropped before any patch is fetched.
    if settings.max_patch_lines > 0 {
        let total_changed: u64 = candidates.iter().map(NumstatEntry::changed_lines).sum();
        if total_changed as usize > settings.max_patch_lines {
            let per_file_limit = (settings.max_patch_lines / 2).max(200) as u64;
            candidates.retain(|entry| {
                if entry.changed_lines() >= per_file_limit {
                    exclude(
                        &mut excluded,
                        entry,
                        format!("large diff ({} lines)", entry.changed_lines()),
                    );
                    false
                } else {
                    true
                }
            });
        }
    }

    let mut budget = Budget::new(settings);
    let mut patches = Vec::new();
    let mut truncated = false;
    let mut over_budget = Vec::new();

    let mut candidates = candidates.into_iter();
    for entry in candidates.by_ref() {
        let raw = repo.diff_patch(std::slice::from_ref(&entry.path))?;
        let body = raw.trim_end_matches('\n');
        if body.trim().is_empty() {
            continue;
        }

        let lines = body.lines().count();
        let bytes = body.len();
        let tokens = estimate_tokens(body);

        if budget.fits(lines, bytes, tokens) {
            budget.consume(lines, bytes, tokens);
            patches.push(FilePatch {
                path: entry.path.clone(),
                body: body.to_string(),
            });
            continue;
        }

        // First file over budget: keep the prefix that still fits, cut at a
        // line boundary, then stop including anything further.
        truncated = true;
        let prefix = take_prefix_lines(body, budget.lines, budget.remaining_bytes());
        if prefix.is_empty() {
            over_budget.push(entry);
        } else {
            patches.push(FilePatch {
                path: entry.path.clone(),
                body: prefix,
            });
        }
        break;
    }
    for entry in candidates {
        over_budget.push(entry);
    }
    for entry in over_budget {
        exclude(
            &mut excluded,
            &entry,
            format!("diff budget ({} lines)", entry.changed_lines()),
        );
    }

    let filtered = !excluded.is_empty();
    let mut text = patches
        .iter()
        .map(|patch| patch.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    if !excluded.is_empty() {
        text.push_str(&render_excluded_note(&excluded));
    }

    let (text, cut_by_caps) =
        truncate_text(text.trim(), settings.max_patch_lines, settings.max_diff_bytes);

    Ok(DiffContext {
        patches,
        excluded,
        text,
        truncated: truncated || cut_by_caps,
        filtered,
    })
}

fn exclude(excluded: &mut Vec<ExcludedFile>, entry: &NumstatEntry, reason: String) {
    debug!("excluding {} from diff context: {}", entry.path, reason);
    excluded.push(ExcludedFile {
        path: entry.path.clone(),
        reason,
    });
}

fn render_excluded_note(excluded: &[ExcludedFile]) -> String {
    let mut note = String::from("\n\nExcluded files from diff context:\n");
    for file in excluded.iter().take(MAX_EXCLUDED_LISTED) {
        note.push_str(&format!("- {} ({})\n", file.path, file.reason));
    }
    if excluded.len() > MAX_EXCLUDED_LISTED {
        note.push_str(&format!(
            "- ... and {} more\n",
            excluded.len() - MAX_EXCLUDED_LISTED
        ));
    }
    note.trim_end().to_string()
}

// ============================================================================
// Line-boundary truncation
// ============================================================================

/// Apply the line cap and then the byte cap, never cutting mid-line.
/// Returns the capped text and whether anything was dropped.
pub(crate) fn truncate_text(text: &str, max_lines: usize, max_bytes: usize) -> (String, bool) {
    let mut result = text.to_string();
    let mut truncated = false;

    if max_lines > 0 {
        let lines: Vec<&str> = result.lines().collect();
        if lines.len() > max_lines {
            result = lines[..max_lines].join("\n");
            truncated = true;
        }
    }

    if max_bytes > 0 && result.len() > max_bytes {
        result = take_prefix_lines(&result, usize::MAX, max_bytes);
        truncated = true;
    }

    (result, truncated)
}

/// Longest prefix of whole lines within both a line count and a byte size
fn take_prefix_lines(text: &str, max_lines: usize, max_bytes: usize) -> String {
    let mut kept = Vec::new();
    let mut used_bytes = 0;

    for (index, line) in text.lines().enumerate() {
        if index >= max_lines {
            break;
        }
        // Newline joining the previous line counts against the budget.
        let cost = line.len() + usize::from(index > 0);
        if used_bytes + cost > max_bytes {
            break;
        }
        used_bytes += cost;
        kept.push(line);
    }

    kept.join("\n")
}

// ============================================================================
// Tests
// ============================================================================
