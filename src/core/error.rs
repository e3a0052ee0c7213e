use std::io;
use thiserror::Error;

use crate::core::http::FetchError;
use crate::core::vcs::VcsError;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config file error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("HTTP error: {0}")]
    FetchError(#[from] FetchError),
    #[error("VCS error: {0}")]
    VcsError(#[from] VcsError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Credential error: {0}")]
    CredentialError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Workspace error: {0}")]
    WorkspaceError(String),
}

pub type Result<T> = std::result::Result<T, ScoutError>;
