//! `lola mod init`: lay out a new module directory with example content.

use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    module::INSTRUCTIONS_FILE,
    name::validate_module_name,
};

/// Which example items to create. `None` leaves the directory empty.
#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    pub skill: Option<String>,
    pub command: Option<String>,
    pub agent: Option<String>,
    pub mcps: bool,
    pub instructions: bool,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            skill: Some("example-skill".into()),
            command: Some("example-command".into()),
            agent: Some("example-agent".into()),
            mcps: true,
            instructions: true,
        }
    }
}

fn title_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `lola mod init [name]`: scaffold `cwd/name`, or `cwd` itself when no
/// name is given. A named directory must not exist yet.
pub fn init_module(
    cwd: &Path,
    name: Option<&str>,
    options: &ScaffoldOptions,
) -> Result<(PathBuf, Vec<String>)> {
    let module_dir = match name {
        Some(name) => {
            validate_module_name(name)?;
            let dir = cwd.join(name);
            if dir.exists() {
                return Err(Error::already_exists(&dir));
            }
            std::fs::create_dir_all(&dir)?;
            dir
        },
        None => cwd.to_path_buf(),
    };
    let created = scaffold_module(&module_dir, options)?;
    tracing::info!(path = %module_dir.display(), files = created.len(), "module scaffolded");
    Ok((module_dir, created))
}

/// Write example files into `module_dir`, creating it if needed.
///
/// Existing files are left alone. Returns the paths that were created.
pub fn scaffold_module(module_dir: &Path, options: &ScaffoldOptions) -> Result<Vec<String>> {
    let module_name = module_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    validate_module_name(&module_name)?;
    for name in [&options.skill, &options.command, &options.agent]
        .into_iter()
        .flatten()
    {
        validate_module_name(name)?;
    }

    let mut created = Vec::new();
    for dir in ["skills", "commands", "agents"] {
        std::fs::create_dir_all(module_dir.join(dir))?;
    }

    if let Some(skill) = &options.skill {
        let content = format!(
            "---\nname: {skill}\ndescription: Description of what this skill does and when to use it.\n---\n\n# {title} Skill\n\nDescribe the skill's purpose and capabilities here.\n\n## Usage\n\nExplain how to use this skill.\n",
            title = title_case(skill),
        );
        write_new(module_dir, &format!("skills/{skill}/SKILL.md"), &content, &mut created)?;
    }

    if let Some(command) = &options.command {
        let content = format!(
            "---\ndescription: Description of what this command does\nargument-hint: \"[optional args]\"\n---\n\nPrompt instructions for the {command} command.\n\nUse $ARGUMENTS to reference any arguments passed to the command.\n"
        );
        write_new(module_dir, &format!("commands/{command}.md"), &content, &mut created)?;
    }

    if let Some(agent) = &options.agent {
        let content = format!(
            "---\ndescription: Description of what this agent does and when to use it\n---\n\nInstructions for the {title} agent.\n",
            title = title_case(agent),
        );
        write_new(module_dir, &format!("agents/{agent}.md"), &content, &mut created)?;
    }

    if options.mcps {
        let content = serde_json::json!({
            "mcpServers": {
                "example-server": {
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-example"],
                    "env": { "API_KEY": "${API_KEY}" },
                }
            }
        });
        let text = serde_json::to_string_pretty(&content)?;
        write_new(module_dir, "mcps.json", &format!("{text}\n"), &mut created)?;
    }

    if options.instructions {
        let content = format!(
            "# {title}\n\nDescribe when the assistant should reach for this module's skills, commands and agents.\n",
            title = title_case(&module_name),
        );
        write_new(module_dir, INSTRUCTIONS_FILE, &content, &mut created)?;
    }

    Ok(created)
}

fn write_new(root: &Path, rel: &str, content: &str, created: &mut Vec<String>) -> Result<()> {
    let path = root.join(rel);
    if path.exists() {
        tracing::debug!(path = %path.display(), "scaffold file exists, skipping");
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    created.push(rel.to_string());
    Ok(())
}
