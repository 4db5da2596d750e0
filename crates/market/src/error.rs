use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Modules(#[from] lola_modules::Error),

    #[error("failed to download {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("marketplace '{name}' not found")]
    NotFound { name: String },

    #[error("marketplace '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("marketplace '{name}' failed validation:\n  - {}", errors.join("\n  - "))]
    Validation { name: String, errors: Vec<String> },

    #[error("module '{module}' not found in marketplace '{market}'")]
    ModuleNotFound { market: String, module: String },
}

impl Error {
    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
