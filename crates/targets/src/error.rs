use thiserror::Error;

use crate::assistant::Assistant;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::ser::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("{message}")]
    Configuration { message: String },

    #[error("unknown assistant '{name}' (supported: {})", supported.join(", "))]
    UnknownAssistant { name: String, supported: Vec<String> },

    #[error("{assistant} does not support agents")]
    AgentsUnsupported { assistant: Assistant },
}

impl Error {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unknown_assistant(name: &str) -> Self {
        Self::UnknownAssistant {
            name: name.to_string(),
            supported: Assistant::ALL
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
