//! The per-assistant adapter contract.
//!
//! Generators return `Ok(false)` when their source is missing: module content
//! drifting away from an installation is routine, not an error. Removers are
//! idempotent and return whether anything was actually deleted.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::{
    assistant::{Assistant, Root, Scope},
    error::{Error, Result},
    managed::{self, SkillEntry},
    mcp::{self, McpLayout},
};

pub trait Target: Send + Sync {
    fn assistant(&self) -> Assistant;

    fn supports_agents(&self) -> bool {
        true
    }

    /// Skills are listed in one shared markdown file instead of written
    /// out one by one.
    fn uses_managed_section(&self) -> bool {
        false
    }

    /// Whether skills can be installed at `scope` at all.
    fn skills_allowed(&self, _scope: Scope) -> bool {
        true
    }

    fn mcp_layout(&self) -> McpLayout {
        McpLayout::Standard
    }

    // ── Paths ───────────────────────────────────────────────────────────────

    /// Skill directory, or the managed file for managed-section targets.
    fn skill_path(&self, root: &Root) -> Result<PathBuf>;

    fn command_path(&self, root: &Root) -> PathBuf;

    fn agent_path(&self, root: &Root) -> Result<PathBuf>;

    /// Instructions file (or directory for cursor). `None` when unsupported.
    fn instructions_path(&self, root: &Root) -> Option<PathBuf>;

    fn mcp_path(&self, root: &Root) -> PathBuf;

    fn command_file_name(&self, name: &str) -> String {
        format!("{name}.md")
    }

    fn agent_file_name(&self, name: &str) -> String {
        format!("{name}.md")
    }

    // ── Skills ──────────────────────────────────────────────────────────────

    /// Write one skill under `dest_root` as `name`. Copies the skill
    /// directory by default.
    fn generate_skill(
        &self,
        source_dir: &Path,
        dest_root: &Path,
        name: &str,
        _root: &Root,
    ) -> Result<bool> {
        if !source_dir.join(lola_config::SKILL_FILE).is_file() {
            return Ok(false);
        }
        let dest = dest_root.join(name);
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        copy_dir(source_dir, &dest)?;
        Ok(true)
    }

    fn remove_skill(&self, dest_root: &Path, name: &str) -> Result<bool> {
        remove_path(&dest_root.join(name))
    }

    /// Replace `module`'s block in the managed skills file.
    fn write_skill_section(
        &self,
        dest_file: &Path,
        module: &str,
        skills: &[SkillEntry],
        root: &Root,
    ) -> Result<bool> {
        if skills.is_empty() {
            return self.remove_skill_section(dest_file, module);
        }
        let block = managed::skills_block(module, skills, root);
        managed::edit_file(dest_file, |content| managed::upsert_skills(content, module, &block))?;
        Ok(true)
    }

    fn remove_skill_section(&self, dest_file: &Path, module: &str) -> Result<bool> {
        managed::remove_from_file(dest_file, |content| managed::remove_skills(content, module))
    }

    // ── Commands ────────────────────────────────────────────────────────────

    /// Write a command as `name`. Passes markdown through unchanged by default.
    fn generate_command(&self, source: &Path, dest_dir: &Path, name: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        write_file(&dest_dir.join(self.command_file_name(name)), &content)?;
        Ok(true)
    }

    fn remove_command(&self, dest_dir: &Path, name: &str) -> Result<bool> {
        remove_path(&dest_dir.join(self.command_file_name(name)))
    }

    // ── Agents ──────────────────────────────────────────────────────────────

    fn generate_agent(&self, _source: &Path, _dest_dir: &Path, _name: &str) -> Result<bool> {
        Err(Error::AgentsUnsupported {
            assistant: self.assistant(),
        })
    }

    fn remove_agent(&self, dest_dir: &Path, name: &str) -> Result<bool> {
        if !self.supports_agents() {
            return Ok(false);
        }
        remove_path(&dest_dir.join(self.agent_file_name(name)))
    }

    // ── Instructions ────────────────────────────────────────────────────────

    /// Place the module's instructions in the managed instructions section.
    fn generate_instructions(&self, source: &Path, dest: &Path, module: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        if content.trim().is_empty() {
            return Ok(false);
        }
        managed::edit_file(dest, |existing| {
            managed::upsert_instructions(existing, module, &content)
        })?;
        Ok(true)
    }

    fn remove_instructions(&self, dest: &Path, module: &str) -> Result<bool> {
        managed::remove_from_file(dest, |content| managed::remove_instructions(content, module))
    }

    // ── MCP servers ─────────────────────────────────────────────────────────

    fn merge_mcps(&self, dest: &Path, module: &str, servers: &Map<String, Value>) -> Result<bool> {
        mcp::merge_servers(dest, self.mcp_layout(), module, servers)
    }

    /// Remove exactly the recorded `{module}-{name}` keys.
    fn remove_mcps(&self, dest: &Path, keys: &[String]) -> Result<bool> {
        mcp::remove_servers(dest, self.mcp_layout(), keys)
    }
}

/// `Configuration` error for a skill/scope combination the assistant rejects.
pub(crate) fn skills_unsupported(assistant: Assistant, scope: Scope) -> Error {
    Error::configuration(format!("{assistant} does not support skills at {scope} scope"))
}

/// Read a generator's source file; `None` when it no longer exists.
pub(crate) fn read_source(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "generator source missing");
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Delete a file, symlink or directory. `false` if nothing was there.
pub fn remove_path(path: &Path) -> Result<bool> {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(false);
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(true)
}

/// Recursively copy `src` into `dest`, skipping hidden top-level entries
/// such as `.git` and `.lola`.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let walker = walkdir::WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.depth() != 1 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
