use std::path::{Path, PathBuf};

use {lola_modules::SourceKind, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Modules(#[from] lola_modules::Error),

    #[error(
        "cannot handle source: {location}\nsupported sources: git repositories, .tar/.tar.gz/.tgz files or URLs, local folders"
    )]
    Unrecognized { location: String },

    #[error("unsupported source type '{kind}'")]
    UnsupportedType { kind: SourceKind },

    #[error("failed to download {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("git clone failed: {message}")]
    Git { message: String },

    #[error("archive contains unsafe path: {path}")]
    UnsafeArchivePath { path: PathBuf },

    #[error("source no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("module '{module}' has no recorded source and cannot be updated")]
    NoSourceInfo { module: String },

    #[error("{location} does not contain a valid module (no skills, commands, agents, MCP servers or instructions)")]
    NotAModule { location: String },
}

impl Error {
    #[must_use]
    pub fn unrecognized(location: &str) -> Self {
        Self::Unrecognized {
            location: location.to_string(),
        }
    }

    #[must_use]
    pub fn unsafe_archive_path(path: &Path) -> Self {
        Self::UnsafeArchivePath {
            path: path.to_path_buf(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
