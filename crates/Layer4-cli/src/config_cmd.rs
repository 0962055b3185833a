//! `cmtr config` subcommands over the user-level config file.

use cmtr_foundation::{
    global_config_path, read_user_config, set_user_value, unset_user_value, ConfigError, Result,
    Settings, SettingsPatch, CONFIG_KEYS,
};

use crate::ConfigCommand;

pub fn run(command: &ConfigCommand) -> Result<i32> {
    match command {
        ConfigCommand::Path => {
            println!("{}", global_config_path()?.display());
            Ok(0)
        }
        ConfigCommand::List => list(),
        ConfigCommand::Get { key } => get(key),
        ConfigCommand::Set { key, value } => {
            set_user_value(key, value)?;
            Ok(0)
        }
        ConfigCommand::Unset { key } => {
            unset_user_value(key)?;
            Ok(0)
        }
    }
}

/// Print every known key with the value stored in the user file, or the
/// effective value resolved from the current directory when absent.
fn list() -> Result<i32> {
    let user = read_user_config()?;
    let effective = Settings::load(&std::env::current_dir()?, SettingsPatch::default())?;
    for key in CONFIG_KEYS {
        println!("{}", list_line(key, &user, &effective));
    }
    Ok(0)
}

/// One `cmtr config list` line; keys stored in the user file are marked
/// `(override)`, the rest `(default)`.
fn list_line(key: &str, user: &toml::Table, effective: &Settings) -> String {
    match user.get(key) {
        Some(value) => format!("{key} = {} (override)", format_toml_value(value)),
        None => format!("{key} = {} (default)", effective.display_value(key)),
    }
}

fn get(key: &str) -> Result<i32> {
    if !CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()).into());
    }
    match read_user_config()?.get(key) {
        Some(value) => {
            println!("{}", format_toml_value(value));
            Ok(0)
        }
        // Known key with nothing stored: no output, failing exit.
        None => Ok(1),
    }
}

fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
