//! Prompt assembly
//!
//! The user prompt is an XML-style document: each sampled section sits in a
//! labeled tag with file content inside CDATA so diffs cannot be mistaken for
//! markup. Repositories without history get an explicit marker plus fallback
//! guidance instead of examples.

use crate::context::CommitContext;

/// Instructions shared by both backends
pub fn build_system_prompt() -> &'static str {
    "You are an expert software engineer writing concise, accurate Git commit messages. \
     Use the provided staged diff and commit history examples to match the repository's style. \
     The user prompt uses XML-style tags (e.g. <diff_patch>, <log_examples>) and CDATA blocks \
     to label sections; treat those tags as semantic separators, not content.\n\
     Rules:\n\
     - Output ONLY the commit message text (subject line, optional body).\n\
     - Use imperative mood and be specific about the change.\n\
     - Follow the style patterns in the examples (prefixes, casing, punctuation, body formatting).\n\
     - Match body usage to the examples: include a body when bodies are common; omit it when they are not unless essential.\n\
     - If a body is needed, separate it from the subject with a blank line.\n\
     - Keep the subject concise (aim ~50 chars unless examples show otherwise)."
}

/// Render the sampled context as the user prompt
pub fn build_user_prompt(context: &CommitContext) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("<context>".to_string());

    if !context.name_status.is_empty() {
        lines.push("  <staged_files format=\"name-status\">".to_string());
        lines.push(wrap_cdata(&context.name_status));
        lines.push("  </staged_files>".to_string());
    }

    if !context.diff_stat.is_empty() {
        lines.push("  <diff_stat format=\"git-diff-stat\">".to_string());
        lines.push(wrap_cdata(&context.diff_stat));
        lines.push("  </diff_stat>".to_string());
    }

    if !context.diff.text.is_empty() {
        let mut attrs = String::new();
        if context.diff.truncated {
            attrs.push_str(" truncated=\"true\"");
        }
        if context.diff.filtered {
            attrs.push_str(" filtered=\"true\"");
        }
        lines.push(format!("  <diff_patch format=\"git-diff\"{attrs}>"));
        lines.push(wrap_cdata(&context.diff.text));
        lines.push("  </diff_patch>".to_string());
    }

    if !context.log.is_empty() {
        lines.push("  <log_examples>".to_string());
        for (index, entry) in context.log.entries.iter().enumerate() {
            let index = index + 1;
            if entry.paths.is_empty() {
                lines.push(format!("    <commit index=\"{index}\">"));
            } else {
                let paths = xml_escape(&entry.paths.join(" "));
                lines.push(format!("    <commit index=\"{index}\" paths=\"{paths}\">"));
            }
            lines.push(format!(
                "      <subject>{}</subject>",
                xml_escape(&entry.subject)
            ));
            if !entry.body_lines.is_empty() {
                let body = entry.body_lines.join("\n");
                lines.push(format!("      <body>{}</body>", xml_escape(&body)));
            }
            lines.push("    </commit>".to_string());
        }
        lines.push("  </log_examples>".to_string());
    } else if !context.has_history {
        lines.push("  <commit_history status=\"none\" />".to_string());
        lines.push("  <fallback_guidance>".to_string());
        lines.push(wrap_cdata(
            "Default to common git commit conventions: a concise imperative subject \
             (aim for ~50 characters) and add a body only when it clarifies why or \
             impact. If a body is needed, separate it with a blank line and wrap \
             lines around 72 characters. If you choose to add a type/scope prefix, \
             follow Conventional Commits (<type>(scope): <description>).",
        ));
        lines.push("  </fallback_guidance>".to_string());
    }

    lines.push("</context>".to_string());
    lines.join("\n").trim().to_string()
}

/// Wrap the prompt for a codex run, which has no separate system channel
pub fn build_codex_prompt(system_prompt: &str, user_prompt: &str) -> String {
    let parts = [
        system_prompt.trim(),
        "Use ONLY the context below. Do not run any commands. Do not infer additional changes.",
        "Context:",
        user_prompt.trim(),
        "Output ONLY JSON with key \"message\".",
    ];
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Escaping
// ============================================================================

/// CDATA-wrap `text`, splitting any embedded `]]>` terminator
fn wrap_cdata(text: &str) -> String {
    let safe = text.replace("]]>", "]]]]><![CDATA[>");
    format!("<![CDATA[{safe}]]>")
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DiffContext, LogEntry, LogSample};

    fn context() -> CommitContext {
        CommitContext {
            staged_files: vec!["src/lib.rs".to_string()],
            name_status: "M\tsrc/lib.rs".to_string(),
            diff_stat: " src/lib.rs | 2 +-".to_string(),
            diff: DiffContext {
                text: "diff --git a/src/lib.rs\n+line".to_string(),
                ..DiffContext::default()
            },
            log: LogSample::default(),
            has_history: true,
        }
    }

    #[test]
    fn test_user_prompt_contains_labeled_sections() {
        let prompt = build_user_prompt(&context());
        assert!(prompt.starts_with("<context>"));
        assert!(prompt.ends_with("</context>"));
        assert!(prompt.contains("<staged_files format=\"name-status\">"));
        assert!(prompt.contains("<diff_stat format=\"git-diff-stat\">"));
        assert!(prompt.contains("<diff_patch format=\"git-diff\">"));
        assert!(prompt.contains("<![CDATA[diff --git a/src/lib.rs\n+line]]>"));
    }

    #[test]
    fn test_truncated_and_filtered_render_as_attributes() {
        let mut ctx = context();
        ctx.diff.truncated = true;
        ctx.diff.filtered = true;
        let prompt = build_user_prompt(&ctx);
        assert!(prompt.contains("<diff_patch format=\"git-diff\" truncated=\"true\" filtered=\"true\">"));
    }

    #[test]
    fn test_log_entries_render_with_index_paths_subject_body() {
        let mut ctx = context();
        ctx.log = LogSample {
            entries: vec![
                LogEntry {
                    subject: "Add <feature> & more".to_string(),
                    body_lines: vec!["first".to_string(), "second".to_string()],
                    paths: vec!["src/a.rs".to_string(), "src/b.rs".to_string()],
                },
                LogEntry {
                    subject: "No body".to_string(),
                    body_lines: Vec::new(),
                    paths: Vec::new(),
                },
            ],
        };
        let prompt = build_user_prompt(&ctx);
        assert!(prompt.contains("<commit index=\"1\" paths=\"src/a.rs src/b.rs\">"));
        assert!(prompt.contains("<subject>Add &lt;feature&gt; &amp; more</subject>"));
        assert!(prompt.contains("<body>first\nsecond</body>"));
        assert!(prompt.contains("<commit index=\"2\">"));
        assert!(!prompt.contains("<commit index=\"2\"><body>"));
    }

    #[test]
    fn test_no_history_renders_fallback_guidance() {
        let mut ctx = context();
        ctx.has_history = false;
        let prompt = build_user_prompt(&ctx);
        assert!(prompt.contains("<commit_history status=\"none\" />"));
        assert!(prompt.contains("<fallback_guidance>"));
        assert!(prompt.contains("Conventional Commits"));
    }

    #[test]
    fn test_history_without_examples_renders_no_log_section() {
        let prompt = build_user_prompt(&context());
        assert!(!prompt.contains("<log_examples>"));
        assert!(!prompt.contains("<commit_history"));
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        assert_eq!(
            wrap_cdata("before ]]> after"),
            "<![CDATA[before ]]]]><![CDATA[> after]]>"
        );
    }

    #[test]
    fn test_xml_escape_covers_all_five() {
        assert_eq!(
            xml_escape("a & b < c > d \" e ' f"),
            "a &amp; b &lt; c &gt; d &quot; e &apos; f"
        );
    }

    #[test]
    fn test_codex_prompt_wraps_system_and_user() {
        let prompt = build_codex_prompt("SYSTEM", "USER");
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], "SYSTEM");
        assert!(lines[1].starts_with("Use ONLY the context below."));
        assert_eq!(lines[2], "Context:");
        assert_eq!(lines[3], "USER");
        assert_eq!(lines[4], "Output ONLY JSON with key \"message\".");
    }
}
