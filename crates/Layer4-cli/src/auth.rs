//! `cmtr auth status`: report which backend a run would pick and why.

use cmtr_backend::{auth_report, AuthReport, CodexStatus};
use cmtr_core::GitOps;
use cmtr_foundation::{Result, Settings, SettingsPatch, API_KEY_VAR};

pub fn status() -> Result<i32> {
    let api_key_set = std::env::var(API_KEY_VAR).is_ok_and(|value| !value.is_empty());
    let codex = CodexStatus::detect();
    // Settings are best-effort here: status still prints outside a repo
    // or with a broken config, it just cannot name a selected mode.
    let settings = GitOps::new(std::env::current_dir()?)
        .ok()
        .and_then(|repo| Settings::load(repo.root(), SettingsPatch::default()).ok());
    let report = auth_report(settings.as_ref(), &codex, api_key_set);
    for line in render(&report) {
        println!("{line}");
    }
    Ok(0)
}

fn render(report: &AuthReport) -> Vec<String> {
    let on_off = |set: bool, yes: &str, no: &str| (if set { yes } else { no }).to_string();
    let mut lines = vec![
        format!("OPENAI_API_KEY: {}", on_off(report.api_key_set, "set", "missing")),
        format!("codex CLI: {}", on_off(report.codex_installed, "found", "not found")),
        format!("npx: {}", on_off(report.npx_installed, "found", "not found")),
        format!("codex auth.json: {}", on_off(report.auth_exists, "present", "missing")),
        format!("codex auth path: {}", report.auth_path.display()),
        match report.prefer_codex {
            Some(value) => format!("prefer_codex: {value}"),
            None => "prefer_codex: unknown".to_string(),
        },
        format!("selected mode: {}", report.mode),
    ];
    if let Some(note) = &report.note {
        lines.push(format!("note: {note}"));
    }
    lines
}
