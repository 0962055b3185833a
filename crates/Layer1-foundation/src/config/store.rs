//! User-level config store
//!
//! Reads and writes `~/.config/cmtr/config.toml` (or the `XDG_CONFIG_HOME`
//! equivalent). Writes always re-serialize with sorted keys so repeated edits
//! do not reshuffle the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::{parse_bool, ConfigError, ConfigLayer, CONFIG_KEYS};

const INT_KEYS: &[&str] = &[
    "max_diff_bytes",
    "max_patch_lines",
    "max_log_entries",
    "max_log_paths",
    "max_log_body_lines",
];

/// Path of the user config file
pub fn global_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("cmtr").join("config.toml"));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join("cmtr").join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Read the user config file, or an empty table when it does not exist
pub fn read_user_config() -> Result<toml::Table, ConfigError> {
    let path = global_config_path()?;
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    read_table(&path, ConfigLayer::UserFile)
}

/// Replace the user config file with `table`
pub fn write_user_config(table: &toml::Table) -> Result<(), ConfigError> {
    let path = global_config_path()?;
    write_table(&path, table)
}

/// Set one key in the user config file, coercing `raw` to the key's type
pub fn set_user_value(key: &str, raw: &str) -> Result<(), ConfigError> {
    let value = coerce_user_value(key, raw)?;
    let mut table = read_user_config()?;
    table.insert(key.to_string(), value);
    write_user_config(&table)
}

/// Remove one key from the user config file; absent keys are fine
pub fn unset_user_value(key: &str) -> Result<(), ConfigError> {
    ensure_known_key(key)?;
    let mut table = read_user_config()?;
    table.remove(key);
    write_user_config(&table)
}

/// Coerce a raw CLI string into the TOML value stored for `key`
pub fn coerce_user_value(key: &str, raw: &str) -> Result<toml::Value, ConfigError> {
    ensure_known_key(key)?;
    if INT_KEYS.contains(&key) {
        let parsed = raw
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid_user_value(key, "an integer"))?;
        return Ok(toml::Value::Integer(parsed as i64));
    }
    if key == "timeout_seconds" {
        let parsed = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid_user_value(key, "a number"))?;
        return Ok(toml::Value::Float(parsed));
    }
    if key == "prefer_codex" {
        let parsed = parse_bool(raw).ok_or_else(|| invalid_user_value(key, "a boolean"))?;
        return Ok(toml::Value::Boolean(parsed));
    }
    Ok(toml::Value::String(raw.to_string()))
}

pub(crate) fn ensure_known_key(key: &str) -> Result<(), ConfigError> {
    if CONFIG_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ConfigError::UnknownKey(key.to_string()))
    }
}

fn invalid_user_value(key: &str, expected: &str) -> ConfigError {
    // Only called after ensure_known_key, so looking up the static name is safe.
    let key = CONFIG_KEYS
        .iter()
        .find(|known| **known == key)
        .copied()
        .unwrap_or("config");
    ConfigError::InvalidValue {
        layer: ConfigLayer::UserFile,
        key,
        message: format!("{key} must be {expected}"),
    }
}

// ============================================================================
// File IO
// ============================================================================

pub(crate) fn read_table(path: &Path, layer: ConfigLayer) -> Result<toml::Table, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        layer,
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    text.parse::<toml::Table>().map_err(|e| ConfigError::Malformed {
        layer,
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub(crate) fn write_table(path: &Path, table: &toml::Table) -> Result<(), ConfigError> {
    let unwritable = |message: String| ConfigError::Unwritable {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| unwritable(e.to_string()))?;
    }

    // Sorted serialization keeps diffs of the config file stable.
    let sorted: BTreeMap<&String, &toml::Value> = table.iter().collect();
    let text = toml::to_string(&sorted).map_err(|e| unwritable(e.to_string()))?;
    fs::write(path, text).map_err(|e| unwritable(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
