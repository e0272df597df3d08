use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::platform::UnknownPlatform;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("config layer {path} must be a mapping at the top level")]
    NotAMapping { path: PathBuf },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error(transparent)]
    Platform(#[from] UnknownPlatform),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
