//! Source-tracking sidecar stored at `<module>/.lola/source.yml`.

use std::{fmt, path::Path, str::FromStr};

use {
    lola_config::SOURCE_FILE,
    serde::{Deserialize, Serialize},
};

use crate::error::Result;

/// Kinds of location a module can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Git,
    Folder,
    Tar,
    Tarurl,
    Zip,
    Zipurl,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Folder => "folder",
            Self::Tar => "tar",
            Self::Tarurl => "tarurl",
            Self::Zip => "zip",
            Self::Zipurl => "zipurl",
        }
    }

    /// Local kinds record an absolute path so later updates work from any cwd.
    pub fn is_local(self) -> bool {
        matches!(self, Self::Folder | Self::Tar | Self::Zip)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "folder" => Ok(Self::Folder),
            "tar" => Ok(Self::Tar),
            "tarurl" => Ok(Self::Tarurl),
            "zip" => Ok(Self::Zip),
            "zipurl" => Ok(Self::Zipurl),
            other => Err(format!("unknown source type '{other}'")),
        }
    }
}

/// Where a registered module came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

impl SourceInfo {
    /// Build a record, resolving local sources to absolute paths.
    pub fn new(source: &str, kind: SourceKind) -> Self {
        let source = if kind.is_local() {
            std::path::absolute(source)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| source.to_string())
        } else {
            source.to_string()
        };
        Self { source, kind }
    }

    /// Read the sidecar of the module at `module_dir`, if it exists.
    pub fn load(module_dir: &Path) -> Result<Option<Self>> {
        let path = module_dir.join(SOURCE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&raw)?))
    }

    pub fn save(&self, module_dir: &Path) -> Result<()> {
        let path = module_dir.join(SOURCE_FILE);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_sources_become_absolute() {
        let info = SourceInfo::new("relative/dir", SourceKind::Folder);
        assert!(Path::new(&info.source).is_absolute());

        let url = "https://github.com/acme/skills.git";
        assert_eq!(SourceInfo::new(url, SourceKind::Git).source, url);
    }

    #[test]
    fn sidecar_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(SourceInfo::load(tmp.path()).unwrap().is_none());

        let info = SourceInfo::new("https://example.com/m.tar.gz", SourceKind::Tarurl);
        info.save(tmp.path()).unwrap();
        let raw = std::fs::read_to_string(tmp.path().join(".lola/source.yml")).unwrap();
        assert!(raw.contains("type: tarurl"));
        assert_eq!(SourceInfo::load(tmp.path()).unwrap(), Some(info));
    }

    #[test]
    fn kind_parses_from_display() {
        for kind in [SourceKind::Git, SourceKind::Folder, SourceKind::Tarurl] {
            assert_eq!(kind.to_string().parse::<SourceKind>().unwrap(), kind);
        }
        assert!("svn".parse::<SourceKind>().is_err());
    }
}
