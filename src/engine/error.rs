//! Errors raised by the context lifecycle manager.

use thiserror::Error;

use crate::ffi::BridgeError;

/// Errors that can occur while driving the native context.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no model loaded")]
    NotLoaded,

    #[error("engine context is closed")]
    Closed,

    #[error("invalid generation options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Native(#[from] BridgeError),
}

impl EngineError {
    /// Returns true if the operation was refused before reaching the engine
    /// because of the context state.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotLoaded | Self::Closed)
    }

    /// Returns true if the caller supplied bad options.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::InvalidOptions(_))
    }
}
