//! Model resolution errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("model '{0}' not found locally and not a valid path")]
    UnknownModel(String),

    #[error("model file not found: {0}")]
    MissingFile(PathBuf),

    #[error("model '{0}' is already registered")]
    Conflict(String),

    #[error("invalid model name '{0}'")]
    InvalidName(String),

    #[error("invalid manifest for '{name}': {reason}")]
    Manifest { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    /// Returns true for unknown models and absent files.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownModel(_) | Self::MissingFile(_))
    }
}
