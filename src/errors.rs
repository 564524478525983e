// src/errors.rs

//! Crate-wide error type and aliases.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task registered twice: {0}")]
    DuplicateTask(String),

    #[error("Cycle detected between composite tasks: {0}")]
    CompositeCycle(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Transform of {path:?} failed: {message}")]
    Transform { path: PathBuf, message: String },

    #[error("Task '{task}' did not complete within {timeout:?}")]
    TaskTimeout { task: String, timeout: Duration },

    #[error("Task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SiteflowError {
    /// Errors that must stop the process before any task runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SiteflowError::ConfigError(_)
                | SiteflowError::UnknownTask(_)
                | SiteflowError::DuplicateTask(_)
                | SiteflowError::CompositeCycle(_)
                | SiteflowError::InvalidGlob { .. }
                | SiteflowError::TomlError(_)
        )
    }

    pub fn transform(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SiteflowError::Transform {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SiteflowError>;
