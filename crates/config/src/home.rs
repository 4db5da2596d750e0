use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable that relocates the lola home directory.
pub const LOLA_HOME_ENV: &str = "LOLA_HOME";

/// Registry of installations, relative to the lola home.
pub const INSTALLED_FILE: &str = "installed.yml";

/// Skill description file inside every skill directory.
pub const SKILL_FILE: &str = "SKILL.md";

/// MCP sidecar at a module's content root.
pub const MCPS_FILE: &str = "mcps.json";

/// Source-tracking sidecar, relative to a registered module directory.
pub const SOURCE_FILE: &str = ".lola/source.yml";

/// Returns the current user's home directory.
pub fn user_home() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(Error::NoHomeDir)
}

/// Filesystem layout rooted at `LOLA_HOME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LolaHome {
    root: PathBuf,
}

impl LolaHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$LOLA_HOME` if set and non-empty, otherwise `~/.lola`.
    pub fn discover() -> Result<Self> {
        if let Ok(value) = std::env::var(LOLA_HOME_ENV)
            && !value.trim().is_empty()
        {
            return Ok(Self::new(value));
        }
        Ok(Self::new(user_home()?.join(".lola")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Global module registry: one directory per added module.
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join("modules")
    }

    pub fn installed_file(&self) -> PathBuf {
        self.root.join(INSTALLED_FILE)
    }

    /// Marketplace reference files (`<name>.yml`).
    pub fn market_dir(&self) -> PathBuf {
        self.root.join("market")
    }

    /// Cached marketplace catalogs (`<name>.yml`).
    pub fn cache_dir(&self) -> PathBuf {
        self.market_dir().join("cache")
    }

    /// Staging area for user-scope installations.
    pub fn user_staging_dir(&self) -> PathBuf {
        self.root.join("user").join("modules")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Create the directories lola writes into.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.modules_dir(), self.market_dir(), self.cache_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_home() {
        let home = LolaHome::new("/tmp/lola-home");
        assert_eq!(home.modules_dir(), PathBuf::from("/tmp/lola-home/modules"));
        assert_eq!(
            home.installed_file(),
            PathBuf::from("/tmp/lola-home/installed.yml")
        );
        assert_eq!(
            home.cache_dir(),
            PathBuf::from("/tmp/lola-home/market/cache")
        );
        assert_eq!(
            home.user_staging_dir(),
            PathBuf::from("/tmp/lola-home/user/modules")
        );
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let home = LolaHome::new(tmp.path().join("lola"));
        home.ensure_dirs().unwrap();
        assert!(home.modules_dir().is_dir());
        assert!(home.cache_dir().is_dir());
    }
}
