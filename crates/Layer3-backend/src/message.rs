//! Sanitized commit message produced by a backend

use std::fmt;

/// A commit message after sanitization, guaranteed non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMessage(String);

impl GeneratedMessage {
    /// Sanitize raw model output; `None` when nothing usable remains
    pub fn from_raw(raw: &str) -> Option<Self> {
        let message = sanitize_message(raw);
        if message.is_empty() {
            None
        } else {
            Some(GeneratedMessage(message))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GeneratedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip the markdown fence or symmetric quotes models like to wrap
/// answers in. Applied to both backends' output.
pub(crate) fn sanitize_message(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if text.starts_with("```") && text.ends_with("```") {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() >= 2 {
            text = lines[1..lines.len() - 1].join("\n").trim().to_string();
        }
    }

    if text.len() > 1 && text.starts_with('"') && text.ends_with('"') {
        text = text[1..text.len() - 1].trim().to_string();
    }

    if text.len() > 1 && text.starts_with('\'') && text.ends_with('\'') {
        text = text[1..text.len() - 1].trim().to_string();
    }

    text
}
