//! Supported assistants, installation scopes and the directory a scope
//! resolves to.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    claude::ClaudeCodeTarget,
    cursor::CursorTarget,
    error::{Error, Result},
    gemini::GeminiTarget,
    opencode::OpenCodeTarget,
    target::Target,
};

/// The closed set of assistants lola can install into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Assistant {
    #[serde(rename = "claude-code")]
    ClaudeCode,
    #[serde(rename = "cursor")]
    Cursor,
    #[serde(rename = "gemini-cli")]
    GeminiCli,
    #[serde(rename = "opencode")]
    OpenCode,
}

impl Assistant {
    pub const ALL: [Self; 4] = [Self::ClaudeCode, Self::Cursor, Self::GeminiCli, Self::OpenCode];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
            Self::Cursor => "cursor",
            Self::GeminiCli => "gemini-cli",
            Self::OpenCode => "opencode",
        }
    }

    /// The adapter for this assistant.
    pub fn target(self) -> &'static dyn Target {
        match self {
            Self::ClaudeCode => &ClaudeCodeTarget,
            Self::Cursor => &CursorTarget,
            Self::GeminiCli => &GeminiTarget,
            Self::OpenCode => &OpenCodeTarget,
        }
    }
}

impl fmt::Display for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Assistant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| Error::unknown_assistant(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Project,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "project" => Ok(Self::Project),
            other => Err(Error::configuration(format!(
                "invalid scope '{other}': must be 'user' or 'project'"
            ))),
        }
    }
}

/// Base directory generated files are written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    /// A project directory.
    Project(PathBuf),
    /// The user's home directory.
    User(PathBuf),
}

impl Root {
    /// Resolve `scope` to a base directory.
    ///
    /// Project scope requires a project path; user scope ignores it.
    pub fn resolve(scope: Scope, project_path: Option<&Path>, home: &Path) -> Result<Self> {
        match scope {
            Scope::Project => project_path
                .map(|p| Self::Project(p.to_path_buf()))
                .ok_or_else(|| Error::configuration("project scope requires a project path")),
            Scope::User => Ok(Self::User(home.to_path_buf())),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Project(_) => Scope::Project,
            Self::User(_) => Scope::User,
        }
    }

    pub fn base(&self) -> &Path {
        match self {
            Self::Project(p) | Self::User(p) => p,
        }
    }

    pub fn project_path(&self) -> Option<&Path> {
        match self {
            Self::Project(p) => Some(p),
            Self::User(_) => None,
        }
    }

    /// `project_rel` under a project, `user_rel` under the home directory.
    pub fn join_scoped(&self, project_rel: &str, user_rel: &str) -> PathBuf {
        match self {
            Self::Project(p) => p.join(project_rel),
            Self::User(home) => home.join(user_rel),
        }
    }

    /// How generated content refers to `path`: relative to the project for
    /// project scope, unchanged for user scope.
    pub fn display_path(&self, path: &Path) -> PathBuf {
        match self {
            Self::Project(p) => path
                .strip_prefix(p)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()),
            Self::User(_) => path.to_path_buf(),
        }
    }
}
