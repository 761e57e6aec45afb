#![deny(unsafe_code)]

use std::path::PathBuf;

use commons_model::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid field-group config: {message}")]
    InvalidHeader { message: String },

    #[error("no field-group config given and {var} is not set")]
    MissingPath { var: &'static str },

    #[error("invalid field groups in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

impl ConfigLoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
