use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read installation registry {path}: {source}")]
    Registry {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Modules(#[from] lola_modules::Error),

    #[error(transparent)]
    Targets(#[from] lola_targets::Error),

    #[error("module '{name}' not found")]
    ModuleNotFound { name: String },

    #[error("'{name}' is not a valid module: no skills, commands, agents, MCP servers or instructions found")]
    InvalidModule { name: String },

    #[error("project path does not exist: {path}")]
    ProjectNotFound { path: PathBuf },
}

impl Error {
    #[must_use]
    pub fn module_not_found(name: &str) -> Self {
        Self::ModuleNotFound {
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn project_not_found(path: &Path) -> Self {
        Self::ProjectNotFound {
            path: path.to_path_buf(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
