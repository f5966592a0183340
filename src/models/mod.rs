//! Model resolution for the gateway.
//!
//! Maps a user-given identifier (file path or registered name) to a model
//! file, backed by one persisted manifest per registered model.

mod error;
pub mod manifest;
mod resolver;
mod store;

pub use error::ResolveError;
pub use manifest::ModelManifest;
pub use resolver::{ModelResolver, RegisterOptions};
pub use store::ManifestStore;
