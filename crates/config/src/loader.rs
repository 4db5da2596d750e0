use std::path::Path;

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    home::LolaHome,
    schema::LolaConfig,
};

/// Load `config.toml` from the given path.
pub fn load_config(path: &Path) -> Result<LolaConfig> {
    let raw = std::fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `<LOLA_HOME>/config.toml`.
///
/// Returns `LolaConfig::default()` when the file is missing or unreadable.
pub fn discover_and_load(home: &LolaHome) -> LolaConfig {
    let path = home.config_file();
    if !path.exists() {
        debug!(path = %path.display(), "no config file found, using defaults");
        return LolaConfig::default();
    }
    match load_config(&path) {
        Ok(cfg) => {
            debug!(path = %path.display(), "loaded config");
            cfg
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            LolaConfig::default()
        },
    }
}

/// Serialize `config` to `<LOLA_HOME>/config.toml`, creating the home if needed.
pub fn save_config(home: &LolaHome, config: &LolaConfig) -> Result<()> {
    let path = home.config_file();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(config)?)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let home = LolaHome::new(tmp.path());
        let cfg = discover_and_load(&home);
        assert_eq!(cfg, LolaConfig::default());
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn parses_install_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let home = LolaHome::new(tmp.path());
        std::fs::write(
            home.config_file(),
            "[install]\nassistants = [\"claude-code\"]\nscope = \"user\"\n",
        )
        .unwrap();
        let cfg = discover_and_load(&home);
        assert_eq!(cfg.install.assistants, vec!["claude-code"]);
        assert_eq!(cfg.install.scope.as_deref(), Some("user"));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let home = LolaHome::new(tmp.path());
        std::fs::write(home.config_file(), "[install\nassistants = ").unwrap();
        assert!(load_config(&home.config_file()).is_err());
        assert_eq!(discover_and_load(&home), LolaConfig::default());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let home = LolaHome::new(tmp.path().join("nested"));
        let mut cfg = LolaConfig::default();
        cfg.install.assistants = vec!["cursor".into(), "opencode".into()];
        save_config(&home, &cfg).unwrap();
        assert_eq!(load_config(&home.config_file()).unwrap(), cfg);
    }
}
