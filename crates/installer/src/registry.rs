//! `installed.yml`: what was installed where.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use {
    lola_targets::{Assistant, Root, Scope},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

const REGISTRY_VERSION: &str = "1.0";

/// Kinds of generated item tracked per installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Skill,
    Command,
    Agent,
    Mcp,
    Instructions,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Command => "command",
            Self::Agent => "agent",
            Self::Mcp => "mcp",
            Self::Instructions => "instructions",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One module installed for one (assistant, scope, project).
///
/// Item lists hold final installed names, after collision resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub module: String,
    pub assistant: Assistant,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub mcps: Vec<String>,
    #[serde(default)]
    pub has_instructions: bool,
}

impl Installation {
    /// An empty record for the slot a root describes.
    pub fn new(module: &str, assistant: Assistant, root: &Root) -> Self {
        Self {
            module: module.to_string(),
            assistant,
            scope: root.scope(),
            project_path: root.project_path().map(Path::to_path_buf),
            skills: Vec::new(),
            commands: Vec::new(),
            agents: Vec::new(),
            mcps: Vec::new(),
            has_instructions: false,
        }
    }

    pub fn same_key(&self, other: &Self) -> bool {
        self.module == other.module && self.same_slot(other)
    }

    /// Same (assistant, scope, project) slot, regardless of module.
    pub fn same_slot(&self, other: &Self) -> bool {
        self.assistant == other.assistant
            && self.scope == other.scope
            && self.project_path == other.project_path
    }

    /// Same module staged at the same root, regardless of assistant.
    pub fn same_staging(&self, other: &Self) -> bool {
        self.module == other.module
            && self.scope == other.scope
            && self.project_path == other.project_path
    }

    pub fn names(&self, kind: ItemKind) -> &[String] {
        match kind {
            ItemKind::Skill => &self.skills,
            ItemKind::Command => &self.commands,
            ItemKind::Agent => &self.agents,
            ItemKind::Mcp => &self.mcps,
            ItemKind::Instructions => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.commands.is_empty()
            && self.agents.is_empty()
            && self.mcps.is_empty()
            && !self.has_instructions
    }

    /// A project installation whose directory no longer exists.
    pub fn is_stale(&self) -> bool {
        self.project_path.as_deref().is_some_and(|p| !p.exists())
    }

    pub fn root(&self, user_home: &Path) -> Result<Root> {
        Ok(Root::resolve(
            self.scope,
            self.project_path.as_deref(),
            user_home,
        )?)
    }
}

/// Narrows which records an operation touches. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallFilter {
    pub module: Option<String>,
    pub assistant: Option<Assistant>,
    pub scope: Option<Scope>,
    pub project_path: Option<PathBuf>,
}

impl InstallFilter {
    pub fn module(name: &str) -> Self {
        Self {
            module: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, inst: &Installation) -> bool {
        self.module.as_ref().is_none_or(|m| *m == inst.module)
            && self.assistant.is_none_or(|a| a == inst.assistant)
            && self.scope.is_none_or(|s| s == inst.scope)
            && self
                .project_path
                .as_ref()
                .is_none_or(|p| inst.project_path.as_ref() == Some(p))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    version: String,
    #[serde(default)]
    installations: Vec<Installation>,
}

/// Installation records backed by a YAML file.
///
/// Every mutation rewrites the whole file (temp file + rename). Concurrent
/// processes are not coordinated: the last writer wins.
#[derive(Debug)]
pub struct InstallationRegistry {
    path: PathBuf,
    installations: Vec<Installation>,
}

impl InstallationRegistry {
    /// Load the registry at `path`; a missing or empty file is an empty registry.
    pub fn load(path: PathBuf) -> Result<Self> {
        let installations = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => {
                let file: RegistryFile = serde_yaml::from_str(&raw).map_err(|source| {
                    Error::Registry {
                        path: path.clone(),
                        source,
                    }
                })?;
                file.installations
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            installations,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert `inst`, replacing any record with the same key in place.
    pub fn add(&mut self, inst: Installation) -> Result<()> {
        match self.installations.iter_mut().find(|i| i.same_key(&inst)) {
            Some(existing) => *existing = inst,
            None => self.installations.push(inst),
        }
        self.save()
    }

    /// All records for a module.
    pub fn find(&self, module: &str) -> Vec<&Installation> {
        self.installations
            .iter()
            .filter(|i| i.module == module)
            .collect()
    }

    /// The record occupying `key`'s slot, if any.
    pub fn get(&self, key: &Installation) -> Option<&Installation> {
        self.installations.iter().find(|i| i.same_key(key))
    }

    pub fn matching(&self, filter: &InstallFilter) -> Vec<&Installation> {
        self.installations
            .iter()
            .filter(|i| filter.matches(i))
            .collect()
    }

    /// Remove every record matching `filter` and return them.
    pub fn remove(&mut self, filter: &InstallFilter) -> Result<Vec<Installation>> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.installations)
            .into_iter()
            .partition(|i| filter.matches(i));
        self.installations = kept;
        self.save()?;
        Ok(removed)
    }

    /// Remove the record with `key`'s key. Returns whether one existed.
    pub fn remove_key(&mut self, key: &Installation) -> Result<bool> {
        let before = self.installations.len();
        self.installations.retain(|i| !i.same_key(key));
        if self.installations.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn all(&self) -> &[Installation] {
        &self.installations
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = RegistryFile {
            version: REGISTRY_VERSION.to_string(),
            installations: self.installations.clone(),
        };
        let tmp = self.path.with_extension("yml.tmp");
        std::fs::write(&tmp, serde_yaml::to_string(&file)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn record(module: &str, assistant: Assistant, project: Option<&str>) -> Installation {
        Installation {
            module: module.into(),
            assistant,
            scope: if project.is_some() {
                Scope::Project
            } else {
                Scope::User
            },
            project_path: project.map(PathBuf::from),
            skills: vec![format!("{module}-a")],
            commands: vec!["go".into()],
            agents: Vec::new(),
            mcps: Vec::new(),
            has_instructions: false,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = InstallationRegistry::load(tmp.path().join("installed.yml")).unwrap();
        assert!(reg.all().is_empty());
    }

    #[test]
    fn add_replaces_by_key_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("installed.yml");
        let mut reg = InstallationRegistry::load(path.clone()).unwrap();

        reg.add(record("demo", Assistant::ClaudeCode, Some("/p1"))).unwrap();
        let mut replacement = record("demo", Assistant::ClaudeCode, Some("/p1"));
        replacement.skills = vec!["a".into()];
        reg.add(replacement.clone()).unwrap();
        reg.add(record("demo", Assistant::Cursor, Some("/p1"))).unwrap();

        assert_eq!(reg.all().len(), 2);
        let reloaded = InstallationRegistry::load(path.clone()).unwrap();
        assert_eq!(reloaded.all(), reg.all());
        assert_eq!(reloaded.get(&replacement), Some(&replacement));
        assert!(!tmp.path().join("installed.yml.tmp").exists());
    }

    #[test]
    fn file_format_omits_null_project_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("installed.yml");
        let mut reg = InstallationRegistry::load(path.clone()).unwrap();
        reg.add(record("demo", Assistant::GeminiCli, None)).unwrap();
        reg.add(record("demo", Assistant::GeminiCli, Some("/p"))).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("version: '1.0'\n"));
        assert_eq!(raw.matches("project_path").count(), 1);
        assert!(!raw.contains("null"));
        assert!(raw.contains("assistant: gemini-cli"));
    }

    #[test]
    fn remove_honours_only_given_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = InstallationRegistry::load(tmp.path().join("installed.yml")).unwrap();
        reg.add(record("demo", Assistant::ClaudeCode, Some("/p1"))).unwrap();
        reg.add(record("demo", Assistant::Cursor, Some("/p1"))).unwrap();
        reg.add(record("demo", Assistant::ClaudeCode, Some("/p2"))).unwrap();
        reg.add(record("other", Assistant::ClaudeCode, Some("/p1"))).unwrap();

        let removed = reg
            .remove(&InstallFilter {
                module: Some("demo".into()),
                assistant: Some(Assistant::ClaudeCode),
                ..InstallFilter::default()
            })
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|r| r.assistant == Assistant::ClaudeCode));
        assert_eq!(reg.find("demo").len(), 1);
        assert_eq!(reg.find("other").len(), 1);

        let none = reg.remove(&InstallFilter::module("ghost")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn stale_only_for_missing_project_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let live = record("demo", Assistant::ClaudeCode, tmp.path().to_str());
        assert!(!live.is_stale());
        let gone = record("demo", Assistant::ClaudeCode, Some("/definitely/not/here"));
        assert!(gone.is_stale());
        assert!(!record("demo", Assistant::ClaudeCode, None).is_stale());
    }

    #[test]
    fn corrupt_registry_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("installed.yml");
        std::fs::write(&path, "installations: [{module: 1").unwrap();
        let err = InstallationRegistry::load(path).unwrap_err();
        assert!(err.to_string().contains("installed.yml"));
    }
}
