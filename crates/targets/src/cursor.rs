use std::path::{Path, PathBuf};

use crate::{
    assistant::{Assistant, Root, Scope},
    convert,
    error::Result,
    target::{Target, read_source, remove_path, skills_unsupported, write_file},
};

/// Cursor: one `.mdc` rule per skill under `.cursor/rules`, markdown commands
/// and agents. Skills and instructions are project-only.
pub struct CursorTarget;

impl CursorTarget {
    fn instructions_file(dest_dir: &Path, module: &str) -> PathBuf {
        dest_dir.join(format!("{module}-instructions.mdc"))
    }
}

impl Target for CursorTarget {
    fn assistant(&self) -> Assistant {
        Assistant::Cursor
    }

    fn skills_allowed(&self, scope: Scope) -> bool {
        scope == Scope::Project
    }

    fn skill_path(&self, root: &Root) -> Result<PathBuf> {
        match root {
            Root::Project(p) => Ok(p.join(".cursor/rules")),
            Root::User(_) => Err(skills_unsupported(self.assistant(), Scope::User)),
        }
    }

    fn command_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".cursor/commands", ".cursor/commands")
    }

    fn agent_path(&self, root: &Root) -> Result<PathBuf> {
        Ok(root.join_scoped(".cursor/agents", ".cursor/agents"))
    }

    fn instructions_path(&self, root: &Root) -> Option<PathBuf> {
        root.project_path().map(|p| p.join(".cursor/rules"))
    }

    fn mcp_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".cursor/mcp.json", ".cursor/mcp.json")
    }

    /// Write `<name>.mdc`, pointing relative references at the staged skill.
    fn generate_skill(
        &self,
        source_dir: &Path,
        dest_root: &Path,
        name: &str,
        root: &Root,
    ) -> Result<bool> {
        let Some(content) = read_source(&source_dir.join(lola_config::SKILL_FILE))? else {
            return Ok(false);
        };
        let assets = root.display_path(source_dir);
        let mdc = convert::skill_to_mdc(&content, Some(&assets.display().to_string()))?;
        write_file(&dest_root.join(format!("{name}.mdc")), &mdc)?;
        Ok(true)
    }

    fn remove_skill(&self, dest_root: &Path, name: &str) -> Result<bool> {
        remove_path(&dest_root.join(format!("{name}.mdc")))
    }

    fn generate_agent(&self, source: &Path, dest_dir: &Path, name: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        let rendered = convert::rewrite_agent(&content, &[("name", name)], &[("model", "inherit")])?;
        write_file(&dest_dir.join(self.agent_file_name(name)), &rendered)?;
        Ok(true)
    }

    fn generate_instructions(&self, source: &Path, dest: &Path, module: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(false);
        }
        write_file(
            &Self::instructions_file(dest, module),
            &convert::instructions_to_mdc(module, content)?,
        )?;
        Ok(true)
    }

    fn remove_instructions(&self, dest: &Path, module: &str) -> Result<bool> {
        remove_path(&Self::instructions_file(dest, module))
    }
}
