use std::path::{Path, PathBuf};

use crate::{
    assistant::{Assistant, Root},
    convert,
    error::Result,
    target::{Target, read_source, write_file},
};

/// Claude Code: skill directories under `.claude/skills`, markdown commands
/// and agents, instructions in `CLAUDE.md`.
pub struct ClaudeCodeTarget;

impl Target for ClaudeCodeTarget {
    fn assistant(&self) -> Assistant {
        Assistant::ClaudeCode
    }

    fn skill_path(&self, root: &Root) -> Result<PathBuf> {
        Ok(root.join_scoped(".claude/skills", ".claude/skills"))
    }

    fn command_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".claude/commands", ".claude/commands")
    }

    fn agent_path(&self, root: &Root) -> Result<PathBuf> {
        Ok(root.join_scoped(".claude/agents", ".claude/agents"))
    }

    fn instructions_path(&self, root: &Root) -> Option<PathBuf> {
        Some(root.join_scoped("CLAUDE.md", ".claude/CLAUDE.md"))
    }

    fn mcp_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".mcp.json", ".claude.json")
    }

    fn generate_agent(&self, source: &Path, dest_dir: &Path, name: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        let rendered = convert::rewrite_agent(&content, &[("name", name)], &[("model", "inherit")])?;
        write_file(&dest_dir.join(self.agent_file_name(name)), &rendered)?;
        Ok(true)
    }
}
