//! Error types for stagesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, validating or saving the deploy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// Underlying I/O failure, annotated with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required parameter was found neither in the file nor in the environment.
    #[error("missing required parameter: {key}")]
    MissingParameter { key: String },

    /// A parameter is present but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while classifying a declared local item.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The declared path does not exist.
    #[error("item does not exist: {path}")]
    MissingSource { path: PathBuf },

    /// The path exists but is neither a regular file nor a directory.
    #[error("unsupported item kind (neither file nor directory): {path}")]
    UnsupportedKind { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
