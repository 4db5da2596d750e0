//! Lola home layout and user settings.
//!
//! Everything lola persists lives under `LOLA_HOME` (default `~/.lola`):
//! the module registry, `installed.yml`, marketplace references and caches,
//! user-scope staging copies, and an optional `config.toml`.

pub mod error;
pub mod home;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    home::{INSTALLED_FILE, LOLA_HOME_ENV, LolaHome, MCPS_FILE, SKILL_FILE, SOURCE_FILE, user_home},
    loader::{discover_and_load, load_config, save_config},
    schema::{InstallConfig, LogConfig, LolaConfig},
};
