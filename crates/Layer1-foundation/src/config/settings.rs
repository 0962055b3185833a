//! Effective settings and layered resolution
//!
//! Settings are resolved once per run from five layers, lowest to highest:
//! built-in defaults, the user config file, the repo `cmtr.toml`, environment
//! variables, and command-line flags. Later layers win field by field, so a
//! repo file can raise one budget while the environment overrides another.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::store;

/// Basename of the per-repository config file, looked up at the repo root.
pub const REPO_CONFIG_FILE: &str = "cmtr.toml";

/// Every key accepted by the config file layers and `cmtr config`.
///
/// `api_key` is deliberately absent: the API key is read from the
/// `OPENAI_API_KEY` environment variable only and is never persisted.
pub const CONFIG_KEYS: &[&str] = &[
    "base_url",
    "max_diff_bytes",
    "max_log_body_lines",
    "max_log_entries",
    "max_log_paths",
    "max_patch_lines",
    "model",
    "organization",
    "prefer_codex",
    "reasoning_effort",
    "text_verbosity",
    "timeout_seconds",
];

/// Environment variable for each key that supports one.
const ENV_VARS: &[(&str, &str)] = &[
    ("model", "CMTR_MODEL"),
    ("max_diff_bytes", "CMTR_MAX_DIFF_BYTES"),
    ("max_patch_lines", "CMTR_MAX_PATCH_LINES"),
    ("max_log_entries", "CMTR_MAX_LOG_ENTRIES"),
    ("max_log_paths", "CMTR_MAX_LOG_PATHS"),
    ("max_log_body_lines", "CMTR_MAX_LOG_BODY_LINES"),
    ("timeout_seconds", "CMTR_TIMEOUT_SECONDS"),
    ("reasoning_effort", "CMTR_REASONING_EFFORT"),
    ("text_verbosity", "CMTR_TEXT_VERBOSITY"),
    ("prefer_codex", "CMTR_PREFER_CODEX"),
    ("base_url", "OPENAI_BASE_URL"),
    ("organization", "OPENAI_ORG"),
];

/// Environment variable holding the API credential. Never stored in files.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

/// Configuration layer a value or failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    Defaults,
    UserFile,
    RepoFile,
    Env,
    Flags,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigLayer::Defaults => "defaults",
            ConfigLayer::UserFile => "user config",
            ConfigLayer::RepoFile => "cmtr.toml",
            ConfigLayer::Env => "environment",
            ConfigLayer::Flags => "flags",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{layer}: {message}")]
    InvalidValue {
        layer: ConfigLayer,
        key: &'static str,
        message: String,
    },

    #[error("{layer}: failed to read {}: {message}", .path.display())]
    Unreadable {
        layer: ConfigLayer,
        path: PathBuf,
        message: String,
    },

    #[error("{layer}: {} is not valid TOML: {message}", .path.display())]
    Malformed {
        layer: ConfigLayer,
        path: PathBuf,
        message: String,
    },

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Could not determine a home directory for the cmtr config")]
    NoConfigDir,

    #[error("failed to write {}: {message}", .path.display())]
    Unwritable { path: PathBuf, message: String },
}

// ============================================================================
// Settings
// ============================================================================

/// Effective configuration after all layers are applied
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Model requested from the API backend
    pub model: String,

    /// Byte budget for the rendered diff patch (0 disables the cap)
    pub max_diff_bytes: usize,

    /// Line budget for the rendered diff patch (0 disables the cap)
    pub max_patch_lines: usize,

    /// Maximum commit-history entries sampled for style examples
    pub max_log_entries: usize,

    /// Maximum paths tagged onto each history entry
    pub max_log_paths: usize,

    /// Maximum body lines kept per history entry
    pub max_log_body_lines: usize,

    /// Backend timeout in seconds, for both the API call and the codex run
    pub timeout_seconds: f64,

    /// Reasoning effort forwarded to the API; empty omits the field
    pub reasoning_effort: String,

    /// Text verbosity forwarded to the API; empty omits the field
    pub text_verbosity: String,

    /// Prefer the codex CLI over the API backend when it is usable
    pub prefer_codex: bool,

    /// Override for the API base URL
    pub base_url: Option<String>,

    /// Organization header sent with API requests
    pub organization: Option<String>,

    /// API key, sourced from the environment only
    pub api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-5.2".to_string(),
            max_diff_bytes: 12_000,
            max_patch_lines: 400,
            max_log_entries: 20,
            max_log_paths: 4,
            max_log_body_lines: 6,
            timeout_seconds: 60.0,
            reasoning_effort: "none".to_string(),
            text_verbosity: "low".to_string(),
            prefer_codex: false,
            base_url: None,
            organization: None,
            api_key: None,
        }
    }
}

impl Settings {
    /// Resolve settings for a repository, layering the user config file, the
    /// repo `cmtr.toml`, the environment, and finally `flags` over the
    /// defaults. Missing files are fine; unreadable or malformed content is
    /// not.
    pub fn load(repo_root: &Path, flags: SettingsPatch) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        let user_path = store::global_config_path()?;
        if user_path.exists() {
            let table = store::read_table(&user_path, ConfigLayer::UserFile)?;
            settings.apply(patch_from_table(&table, ConfigLayer::UserFile)?);
            debug!("applied user config from {}", user_path.display());
        }

        let repo_path = repo_root.join(REPO_CONFIG_FILE);
        if repo_path.exists() {
            let table = store::read_table(&repo_path, ConfigLayer::RepoFile)?;
            settings.apply(patch_from_table(&table, ConfigLayer::RepoFile)?);
            debug!("applied repo config from {}", repo_path.display());
        }

        settings.apply(patch_from_env(|var| std::env::var(var).ok())?);
        settings.apply(flags);

        Ok(settings)
    }

    /// Apply one layer on top of this one, field by field
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.model {
            self.model = v;
        }
        if let Some(v) = patch.max_diff_bytes {
            self.max_diff_bytes = v;
        }
        if let Some(v) = patch.max_patch_lines {
            self.max_patch_lines = v;
        }
        if let Some(v) = patch.max_log_entries {
            self.max_log_entries = v;
        }
        if let Some(v) = patch.max_log_paths {
            self.max_log_paths = v;
        }
        if let Some(v) = patch.max_log_body_lines {
            self.max_log_body_lines = v;
        }
        if let Some(v) = patch.timeout_seconds {
            self.timeout_seconds = v;
        }
        if let Some(v) = patch.reasoning_effort {
            self.reasoning_effort = v;
        }
        if let Some(v) = patch.text_verbosity {
            self.text_verbosity = v;
        }
        if let Some(v) = patch.prefer_codex {
            self.prefer_codex = v;
        }
        if let Some(v) = patch.base_url {
            self.base_url = Some(v);
        }
        if let Some(v) = patch.organization {
            self.organization = Some(v);
        }
        if let Some(v) = patch.api_key {
            self.api_key = Some(v);
        }
    }

    /// Render the value for `key` the way `cmtr config list` prints it
    pub fn display_value(&self, key: &str) -> String {
        fn opt(value: &Option<String>) -> String {
            value.clone().unwrap_or_else(|| "null".to_string())
        }

        match key {
            "model" => self.model.clone(),
            "max_diff_bytes" => self.max_diff_bytes.to_string(),
            "max_patch_lines" => self.max_patch_lines.to_string(),
            "max_log_entries" => self.max_log_entries.to_string(),
            "max_log_paths" => self.max_log_paths.to_string(),
            "max_log_body_lines" => self.max_log_body_lines.to_string(),
            // Debug keeps the decimal point: 60.0 renders as "60.0", not "60".
            "timeout_seconds" => format!("{:?}", self.timeout_seconds),
            "reasoning_effort" => self.reasoning_effort.clone(),
            "text_verbosity" => self.text_verbosity.clone(),
            "prefer_codex" => self.prefer_codex.to_string(),
            "base_url" => opt(&self.base_url),
            "organization" => opt(&self.organization),
            _ => "null".to_string(),
        }
    }
}

/// One layer's worth of overrides; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub model: Option<String>,
    pub max_diff_bytes: Option<usize>,
    pub max_patch_lines: Option<usize>,
    pub max_log_entries: Option<usize>,
    pub max_log_paths: Option<usize>,
    pub max_log_body_lines: Option<usize>,
    pub timeout_seconds: Option<f64>,
    pub reasoning_effort: Option<String>,
    pub text_verbosity: Option<String>,
    pub prefer_codex: Option<bool>,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub api_key: Option<String>,
}

// ============================================================================
// Layer parsing
// ============================================================================

/// Build a patch from one TOML table. Unknown keys are ignored so configs
/// written by newer versions do not break older ones.
pub fn patch_from_table(
    table: &toml::Table,
    layer: ConfigLayer,
) -> Result<SettingsPatch, ConfigError> {
    let mut patch = SettingsPatch::default();
    for (key, value) in table {
        assign(&mut patch, layer, key, value)?;
    }
    Ok(patch)
}

/// Build a patch from environment variables via `lookup`
pub fn patch_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SettingsPatch, ConfigError> {
    let mut patch = SettingsPatch::default();
    for (key, var) in ENV_VARS {
        if let Some(raw) = lookup(var) {
            let value = toml::Value::String(raw);
            assign(&mut patch, ConfigLayer::Env, key, &value)?;
        }
    }
    if let Some(raw) = lookup(API_KEY_VAR) {
        if !raw.is_empty() {
            patch.api_key = Some(raw);
        }
    }
    Ok(patch)
}

fn assign(
    patch: &mut SettingsPatch,
    layer: ConfigLayer,
    key: &str,
    value: &toml::Value,
) -> Result<(), ConfigError> {
    match key {
        "model" => patch.model = Some(string_value(layer, "model", value)?),
        "max_diff_bytes" => {
            patch.max_diff_bytes = Some(int_value(layer, "max_diff_bytes", value)?)
        }
        "max_patch_lines" => {
            patch.max_patch_lines = Some(int_value(layer, "max_patch_lines", value)?)
        }
        "max_log_entries" => {
            patch.max_log_entries = Some(int_value(layer, "max_log_entries", value)?)
        }
        "max_log_paths" => patch.max_log_paths = Some(int_value(layer, "max_log_paths", value)?),
        "max_log_body_lines" => {
            patch.max_log_body_lines = Some(int_value(layer, "max_log_body_lines", value)?)
        }
        "timeout_seconds" => {
            patch.timeout_seconds = Some(float_value(layer, "timeout_seconds", value)?)
        }
        "reasoning_effort" => {
            patch.reasoning_effort = Some(string_value(layer, "reasoning_effort", value)?)
        }
        "text_verbosity" => {
            patch.text_verbosity = Some(string_value(layer, "text_verbosity", value)?)
        }
        "prefer_codex" => patch.prefer_codex = Some(bool_value(layer, "prefer_codex", value)?),
        "base_url" => patch.base_url = Some(string_value(layer, "base_url", value)?),
        "organization" => patch.organization = Some(string_value(layer, "organization", value)?),
        other => debug!("ignoring unknown config key {other}"),
    }
    Ok(())
}

// ============================================================================
// Value coercion
// ============================================================================

fn invalid(layer: ConfigLayer, key: &'static str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        layer,
        key,
        message,
    }
}

fn string_value(
    layer: ConfigLayer,
    key: &'static str,
    value: &toml::Value,
) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        _ => Err(invalid(layer, key, format!("{key} must be a string"))),
    }
}

fn int_value(
    layer: ConfigLayer,
    key: &'static str,
    value: &toml::Value,
) -> Result<usize, ConfigError> {
    let message = || format!("{key} must be an integer");
    match value {
        toml::Value::Integer(i) => usize::try_from(*i).map_err(|_| invalid(layer, key, message())),
        toml::Value::String(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid(layer, key, message())),
        _ => Err(invalid(layer, key, message())),
    }
}

fn float_value(
    layer: ConfigLayer,
    key: &'static str,
    value: &toml::Value,
) -> Result<f64, ConfigError> {
    let message = || format!("{key} must be a number");
    match value {
        toml::Value::Float(f) => Ok(*f),
        toml::Value::Integer(i) => Ok(*i as f64),
        toml::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(layer, key, message())),
        _ => Err(invalid(layer, key, message())),
    }
}

fn bool_value(
    layer: ConfigLayer,
    key: &'static str,
    value: &toml::Value,
) -> Result<bool, ConfigError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::String(s) => parse_bool(s)
            .ok_or_else(|| invalid(layer, key, format!("{key} must be a boolean"))),
        _ => Err(invalid(layer, key, format!("{key} must be a boolean"))),
    }
}

/// Accepted spellings for boolean keys in files and environment variables
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
