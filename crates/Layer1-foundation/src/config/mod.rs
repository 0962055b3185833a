//! Config - layered settings for cmtr
//!
//! - `settings.rs` - effective settings, layer patches, value coercion
//! - `store.rs` - user config file on disk (sorted writes, typed `set`)

mod settings;
mod store;

pub use settings::{
    patch_from_env, patch_from_table, ConfigError, ConfigLayer, Settings, SettingsPatch,
    API_KEY_VAR, CONFIG_KEYS, REPO_CONFIG_FILE,
};
pub use store::{
    coerce_user_value, global_config_path, read_user_config, set_user_value, unset_user_value,
    write_user_config,
};
