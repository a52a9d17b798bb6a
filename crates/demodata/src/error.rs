//! Installer error types.

use std::path::PathBuf;

/// Errors produced while installing demo data.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("quota file line {line}: {text}")]
    Quota { line: usize, text: String },

    #[error("account {account}: {reason}")]
    Account { account: String, reason: String },

    #[error(transparent)]
    Api(#[from] survox_api::Error),
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }
}
