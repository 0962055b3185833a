//! # cmtr-foundation
//!
//! Foundation layer for cmtr:
//! - Config: layered settings (defaults < user file < cmtr.toml < env < flags)
//!   plus the user-level config store
//! - Error: the central error taxonomy every other layer converts into

pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    coerce_user_value,
    global_config_path,
    read_user_config,
    set_user_value,
    unset_user_value,
    write_user_config,
    ConfigError,
    ConfigLayer,
    Settings,
    SettingsPatch,
    API_KEY_VAR,
    CONFIG_KEYS,
    REPO_CONFIG_FILE,
};
