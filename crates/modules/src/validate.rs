use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use {lola_config::SKILL_FILE, serde_json::Value};

use crate::{
    error::{Error, Result},
    frontmatter::{self, Frontmatter},
    module::Module,
};

/// Values accepted for an agent's `model` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentModel {
    Inherit,
    Sonnet,
    Opus,
    Haiku,
}

impl AgentModel {
    pub const ALL: [Self; 4] = [Self::Inherit, Self::Sonnet, Self::Opus, Self::Haiku];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Sonnet => "sonnet",
            Self::Opus => "opus",
            Self::Haiku => "haiku",
        }
    }
}

impl fmt::Display for AgentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!("Invalid model '{s}': must be one of {}", allowed.join(", "))
            })
    }
}

/// Result of [`Module::validate`]. Warnings never fail validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// `(ok, errors)` pair.
    pub fn into_parts(self) -> (bool, Vec<String>) {
        (self.errors.is_empty(), self.errors)
    }
}

impl Module {
    /// Re-read every declared item and check its metadata.
    ///
    /// Read-only and deterministic for identical directory contents.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for skill in &self.skills {
            let file = self.skill_dir_in(&self.path, skill).join(SKILL_FILE);
            let label = self.label(&file);
            for err in check_skill(&file) {
                report.errors.push(format!("{label}: {err}"));
            }
        }

        for command in &self.commands {
            let file = self.command_file_in(&self.path, command);
            let label = self.label(&file);
            let (errors, warnings) = check_command(&file);
            report
                .errors
                .extend(errors.into_iter().map(|e| format!("{label}: {e}")));
            report
                .warnings
                .extend(warnings.into_iter().map(|w| format!("{label}: {w}")));
        }

        for agent in &self.agents {
            let file = self.agent_file_in(&self.path, agent);
            let label = self.label(&file);
            for err in check_agent(&file) {
                report.errors.push(format!("{label}: {err}"));
            }
        }

        if !self.mcps.is_empty() {
            let file = self.mcps_file_in(&self.path);
            let label = self.label(&file);
            if let Some(err) = check_mcps(&file) {
                report.errors.push(format!("{label}: {err}"));
            }
        }

        report
    }

    /// Validate and turn errors into [`Error::Validation`].
    pub fn validate_or_error(&self) -> Result<ValidationReport> {
        let report = self.validate();
        if report.is_ok() {
            Ok(report)
        } else {
            Err(Error::Validation {
                module: self.name.clone(),
                errors: report.errors,
            })
        }
    }

    fn label(&self, file: &Path) -> String {
        file.strip_prefix(&self.path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(file))
            .display()
            .to_string()
    }
}

fn check_skill(file: &Path) -> Vec<String> {
    let doc = match frontmatter::read(file) {
        Ok(doc) => doc,
        Err(e) => return vec![format!("Cannot read file: {e}")],
    };
    match &doc.frontmatter {
        Frontmatter::Missing => vec!["Missing YAML frontmatter (required)".into()],
        Frontmatter::Malformed(e) => vec![format!("Invalid YAML frontmatter - {e}")],
        Frontmatter::Present(_) if doc.non_empty_str("description").is_none() => {
            vec!["Missing required 'description' field in frontmatter".into()]
        },
        Frontmatter::Present(_) => Vec::new(),
    }
}

fn check_command(file: &Path) -> (Vec<String>, Vec<String>) {
    let doc = match frontmatter::read(file) {
        Ok(doc) => doc,
        Err(e) => return (vec![format!("Cannot read file: {e}")], Vec::new()),
    };
    match &doc.frontmatter {
        Frontmatter::Missing => (
            Vec::new(),
            vec!["Warning: Missing frontmatter with 'description' field (recommended)".into()],
        ),
        Frontmatter::Malformed(e) => (vec![format!("Invalid YAML frontmatter - {e}")], Vec::new()),
        Frontmatter::Present(_) if doc.non_empty_str("description").is_none() => (
            Vec::new(),
            vec!["Warning: Missing 'description' field (recommended)".into()],
        ),
        Frontmatter::Present(_) => (Vec::new(), Vec::new()),
    }
}

fn check_agent(file: &Path) -> Vec<String> {
    let doc = match frontmatter::read(file) {
        Ok(doc) => doc,
        Err(e) => return vec![format!("Cannot read file: {e}")],
    };
    match &doc.frontmatter {
        Frontmatter::Missing => return vec!["Missing YAML frontmatter (required)".into()],
        Frontmatter::Malformed(e) => return vec![format!("Invalid YAML frontmatter - {e}")],
        Frontmatter::Present(_) => {},
    }

    let mut errors = Vec::new();
    if doc.non_empty_str("description").is_none() {
        errors.push("Missing required 'description' field in frontmatter".into());
    }
    match doc.get("model") {
        None => {},
        Some(value) => match value.as_str().map(str::parse::<AgentModel>) {
            Some(Ok(_)) => {},
            Some(Err(e)) => errors.push(e),
            None => errors.push("Invalid model: must be a string".into()),
        },
    }
    errors
}

fn check_mcps(file: &Path) -> Option<String> {
    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(e) => return Some(format!("Cannot read file: {e}")),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(root)) => match root.get("mcpServers") {
            Some(Value::Object(_)) => None,
            _ => Some("Missing 'mcpServers' object".into()),
        },
        Ok(_) => Some("Expected a JSON object".into()),
        Err(e) => Some(format!("Invalid JSON - {e}")),
    }
}
