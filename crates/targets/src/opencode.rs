use std::path::{Path, PathBuf};

use crate::{
    assistant::{Assistant, Root},
    convert,
    error::Result,
    mcp::McpLayout,
    target::{Target, read_source, write_file},
};

/// OpenCode: skills and instructions share `AGENTS.md`, commands and agents
/// live in singular `command/` and `agent/` directories.
pub struct OpenCodeTarget;

impl Target for OpenCodeTarget {
    fn assistant(&self) -> Assistant {
        Assistant::OpenCode
    }

    fn uses_managed_section(&self) -> bool {
        true
    }

    fn mcp_layout(&self) -> McpLayout {
        McpLayout::OpenCode
    }

    fn skill_path(&self, root: &Root) -> Result<PathBuf> {
        Ok(root.join_scoped("AGENTS.md", ".config/opencode/AGENTS.md"))
    }

    fn command_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".opencode/command", ".config/opencode/command")
    }

    fn agent_path(&self, root: &Root) -> Result<PathBuf> {
        Ok(root.join_scoped(".opencode/agent", ".config/opencode/agent"))
    }

    fn instructions_path(&self, root: &Root) -> Option<PathBuf> {
        Some(root.join_scoped("AGENTS.md", ".config/opencode/AGENTS.md"))
    }

    fn mcp_path(&self, root: &Root) -> PathBuf {
        root.join_scoped("opencode.json", ".config/opencode/opencode.json")
    }

    fn generate_agent(&self, source: &Path, dest_dir: &Path, name: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        let rendered =
            convert::rewrite_agent(&content, &[("name", name), ("mode", "subagent")], &[])?;
        write_file(&dest_dir.join(self.agent_file_name(name)), &rendered)?;
        Ok(true)
    }
}
