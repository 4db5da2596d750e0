use std::path::{Path, PathBuf};

use {
    lola_config::{MCPS_FILE, SKILL_FILE},
    serde_json::{Map, Value},
};

use crate::frontmatter;

/// Module-level instructions file at the content root.
pub const INSTRUCTIONS_FILE: &str = "AGENTS.md";

/// Subdirectories checked, in order, before falling back to the module root.
const CONTENT_DIRS: &[&str] = &["module", "lola-module"];

/// Snapshot of a module directory.
///
/// Every lookup helper takes a `base` so the same snapshot can address the
/// registered copy or a staged copy with the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    /// Content root relative to `path` (empty when content sits at the root).
    content_dir: PathBuf,
    pub skills: Vec<String>,
    pub commands: Vec<String>,
    pub agents: Vec<String>,
    pub mcps: Vec<String>,
    pub has_instructions: bool,
    /// The content root itself is the only skill.
    pub single_skill: bool,
}

impl Module {
    /// Scan `dir` into a module. Returns `None` when there is nothing to install.
    pub fn load(dir: &Path) -> Option<Self> {
        if !dir.is_dir() {
            return None;
        }
        let name = dir.file_name()?.to_string_lossy().into_owned();
        let content_dir = CONTENT_DIRS
            .iter()
            .map(PathBuf::from)
            .find(|sub| dir.join(sub).is_dir())
            .unwrap_or_default();
        let root = dir.join(&content_dir);

        let mut skills = list_skill_dirs(&root.join("skills"));
        let mut single_skill = false;
        if skills.is_empty() && root.join(SKILL_FILE).is_file() {
            skills.push(single_skill_name(&root));
            single_skill = true;
        }

        let module = Self {
            name,
            path: dir.to_path_buf(),
            commands: list_markdown_stems(&root.join("commands")),
            agents: list_markdown_stems(&root.join("agents")),
            mcps: read_mcp_servers(&root.join(MCPS_FILE))
                .map(|servers| {
                    let mut names: Vec<String> = servers.keys().cloned().collect();
                    names.sort();
                    names
                })
                .unwrap_or_default(),
            has_instructions: has_instructions(&root.join(INSTRUCTIONS_FILE)),
            content_dir,
            skills,
            single_skill,
        };

        if module.is_empty() {
            tracing::debug!(path = %dir.display(), "directory holds no installable content");
            return None;
        }
        Some(module)
    }

    fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.commands.is_empty()
            && self.agents.is_empty()
            && self.mcps.is_empty()
            && !self.has_instructions
    }

    /// Content root under the registered path.
    pub fn content_root(&self) -> PathBuf {
        self.content_root_in(&self.path)
    }

    /// Content root under a copy of the module rooted at `base`.
    pub fn content_root_in(&self, base: &Path) -> PathBuf {
        base.join(&self.content_dir)
    }

    /// Path of the content root relative to the module directory.
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn skill_dir_in(&self, base: &Path, skill: &str) -> PathBuf {
        let root = self.content_root_in(base);
        if self.single_skill {
            root
        } else {
            root.join("skills").join(skill)
        }
    }

    pub fn command_file_in(&self, base: &Path, command: &str) -> PathBuf {
        self.content_root_in(base)
            .join("commands")
            .join(format!("{command}.md"))
    }

    pub fn agent_file_in(&self, base: &Path, agent: &str) -> PathBuf {
        self.content_root_in(base)
            .join("agents")
            .join(format!("{agent}.md"))
    }

    pub fn instructions_file_in(&self, base: &Path) -> PathBuf {
        self.content_root_in(base).join(INSTRUCTIONS_FILE)
    }

    pub fn mcps_file_in(&self, base: &Path) -> PathBuf {
        self.content_root_in(base).join(MCPS_FILE)
    }

    /// The `mcpServers` object of the sidecar under `base`, `None` if unusable.
    pub fn mcp_servers_in(&self, base: &Path) -> Option<Map<String, Value>> {
        read_mcp_servers(&self.mcps_file_in(base))
    }

    /// `description` from a skill's SKILL.md, empty when absent.
    pub fn skill_description_in(&self, base: &Path, skill: &str) -> String {
        let file = self.skill_dir_in(base, skill).join(SKILL_FILE);
        frontmatter::read(&file)
            .ok()
            .and_then(|doc| doc.get_str("description").map(str::to_string))
            .unwrap_or_default()
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| !is_hidden(&n.to_string_lossy()))
        })
        .collect();
    paths.sort();
    paths
}

fn list_skill_dirs(skills_dir: &Path) -> Vec<String> {
    sorted_entries(skills_dir)
        .into_iter()
        .filter(|p| p.is_dir() && p.join(SKILL_FILE).is_file())
        .filter_map(|p| Some(p.file_name()?.to_string_lossy().into_owned()))
        .collect()
}

fn list_markdown_stems(dir: &Path) -> Vec<String> {
    sorted_entries(dir)
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "md"))
        .filter_map(|p| Some(p.file_stem()?.to_string_lossy().into_owned()))
        .collect()
}

/// Name for a module whose content root is itself a skill: the `name` field
/// of SKILL.md if it is a non-empty string, else the content root's name.
fn single_skill_name(root: &Path) -> String {
    let from_frontmatter = frontmatter::read(&root.join(SKILL_FILE))
        .ok()
        .and_then(|doc| doc.non_empty_str("name").map(|s| s.trim().to_string()));
    from_frontmatter.unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

fn has_instructions(path: &Path) -> bool {
    std::fs::read_to_string(path).is_ok_and(|s| !s.trim().is_empty())
}

fn read_mcp_servers(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(mut root)) => match root.remove("mcpServers") {
            Some(Value::Object(servers)) => Some(servers),
            _ => Some(Map::new()),
        },
        Ok(_) => {
            tracing::debug!(path = %path.display(), "mcps.json is not an object, ignoring");
            None
        },
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "malformed mcps.json, ignoring");
            None
        },
    }
}
