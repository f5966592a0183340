//! Context lifecycle layer over the native bridge.
//!
//! Owns the single native context, tracks the loaded model and enforces
//! the preconditions for generation and reset.

pub mod error;
mod lifecycle;
mod options;

pub use error::EngineError;
pub use lifecycle::{ContextManager, ContextState, EngineState};
pub use options::{GenerateOptions, GenerateParameters};
