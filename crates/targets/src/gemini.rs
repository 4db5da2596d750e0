use std::path::{Path, PathBuf};

use crate::{
    assistant::{Assistant, Root, Scope},
    convert,
    error::{Error, Result},
    target::{Target, read_source, skills_unsupported, write_file},
};

/// Gemini CLI: skills listed in a managed section of `GEMINI.md`, TOML
/// commands under `.gemini/commands`, no agents.
pub struct GeminiTarget;

impl Target for GeminiTarget {
    fn assistant(&self) -> Assistant {
        Assistant::GeminiCli
    }

    fn supports_agents(&self) -> bool {
        false
    }

    fn uses_managed_section(&self) -> bool {
        true
    }

    fn skills_allowed(&self, scope: Scope) -> bool {
        scope == Scope::Project
    }

    fn skill_path(&self, root: &Root) -> Result<PathBuf> {
        match root {
            Root::Project(p) => Ok(p.join("GEMINI.md")),
            Root::User(_) => Err(skills_unsupported(self.assistant(), Scope::User)),
        }
    }

    fn command_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".gemini/commands", ".gemini/commands")
    }

    fn agent_path(&self, _root: &Root) -> Result<PathBuf> {
        Err(Error::AgentsUnsupported {
            assistant: self.assistant(),
        })
    }

    fn instructions_path(&self, root: &Root) -> Option<PathBuf> {
        Some(root.join_scoped("GEMINI.md", ".gemini/GEMINI.md"))
    }

    fn mcp_path(&self, root: &Root) -> PathBuf {
        root.join_scoped(".gemini/settings.json", ".gemini/settings.json")
    }

    fn command_file_name(&self, name: &str) -> String {
        format!("{name}.toml")
    }

    fn generate_command(&self, source: &Path, dest_dir: &Path, name: &str) -> Result<bool> {
        let Some(content) = read_source(source)? else {
            return Ok(false);
        };
        let toml_text = convert::command_to_gemini_toml(&content)?;
        write_file(&dest_dir.join(self.command_file_name(name)), &toml_text)?;
        Ok(true)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::managed::SkillEntry};

    #[test]
    fn agents_are_unsupported() {
        let root = Root::Project(PathBuf::from("/p"));
        assert!(!GeminiTarget.supports_agents());
        assert!(matches!(
            GeminiTarget.agent_path(&root),
            Err(Error::AgentsUnsupported { .. })
        ));
        assert!(matches!(
            GeminiTarget.generate_agent(Path::new("/x.md"), Path::new("/p"), "x"),
            Err(Error::AgentsUnsupported { .. })
        ));
        assert!(!GeminiTarget.remove_agent(Path::new("/p"), "x").unwrap());
    }

    #[test]
    fn commands_become_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("fix.md");
        std::fs::write(&src, "---\ndescription: Fix an issue\n---\nFix issue $1 using $ARGUMENTS\n").unwrap();
        let dest = tmp.path().join(".gemini/commands");

        assert!(GeminiTarget.generate_command(&src, &dest, "demo-fix").unwrap());
        let parsed: toml::Value =
            toml::from_str(&std::fs::read_to_string(dest.join("demo-fix.toml")).unwrap()).unwrap();
        assert_eq!(parsed["description"].as_str(), Some("Fix an issue"));
        assert_eq!(
            parsed["prompt"].as_str(),
            Some("Arguments: {{args}}\n\nFix issue $1 using {{args}}")
        );
        assert!(GeminiTarget.remove_command(&dest, "demo-fix").unwrap());
    }

    #[test]
    fn skills_and_instructions_share_gemini_md() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().to_path_buf();
        let root = Root::Project(project.clone());
        let file = GeminiTarget.skill_path(&root).unwrap();
        assert_eq!(Some(file.clone()), GeminiTarget.instructions_path(&root));
        std::fs::write(&file, "# Team notes\n").unwrap();

        let skills = vec![SkillEntry {
            name: "a".into(),
            description: "desc".into(),
            dir: project.join(".lola/modules/demo/skills/a"),
        }];
        assert!(GeminiTarget.write_skill_section(&file, "demo", &skills, &root).unwrap());
        let instructions = tmp.path().join("AGENTS.md");
        std::fs::write(&instructions, "Prefer small diffs.").unwrap();
        assert!(GeminiTarget.generate_instructions(&instructions, &file, "demo").unwrap());

        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.starts_with("# Team notes\n"));
        assert!(content.contains("#### a\n**When to use:** desc\n"));
        assert!(content.contains("Prefer small diffs."));

        assert!(GeminiTarget.remove_skill_section(&file, "demo").unwrap());
        assert!(GeminiTarget.remove_instructions(&file, "demo").unwrap());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "# Team notes\n");
    }
}
