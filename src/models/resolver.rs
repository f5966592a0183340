//! Model identifier resolution and registration.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::error::ResolveError;
use super::manifest::{validate_name, ModelManifest};
use super::store::ManifestStore;

/// Extra fields and policy for [`ModelResolver::register`].
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Replace an existing manifest with the same name instead of failing.
    pub overwrite: bool,
    pub architecture: Option<String>,
    pub parameters: Option<String>,
    pub quantization: Option<String>,
}

/// Maps model identifiers to files, backed by a [`ManifestStore`].
#[derive(Debug, Clone)]
pub struct ModelResolver {
    store: ManifestStore,
}

impl ModelResolver {
    pub fn new(store: ManifestStore) -> Self {
        Self { store }
    }

    /// Open the store rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, ResolveError> {
        Ok(Self::new(ManifestStore::open(base_dir)?))
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Resolve `identifier` to an absolute model path.
    ///
    /// An existing file wins over a registered name that happens to match.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, ResolveError> {
        let candidate = Path::new(identifier);
        if candidate.is_file() {
            return Ok(candidate.canonicalize()?);
        }
        if validate_name(identifier).is_err() {
            return Err(ResolveError::UnknownModel(identifier.to_string()));
        }
        Ok(self.store.load(identifier)?.path)
    }

    /// Register the file at `path` under `name`.
    ///
    /// Duplicate names are rejected with `Conflict` unless
    /// `options.overwrite` is set.
    pub fn register(
        &self,
        name: &str,
        path: &Path,
        options: &RegisterOptions,
    ) -> Result<ModelManifest, ResolveError> {
        validate_name(name)?;
        if !options.overwrite && self.store.contains(name) {
            return Err(ResolveError::Conflict(name.to_string()));
        }

        let path = path
            .canonicalize()
            .map_err(|_| ResolveError::MissingFile(path.to_path_buf()))?;
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(ResolveError::MissingFile(path));
        }

        let manifest = ModelManifest {
            name: name.to_string(),
            path,
            size: metadata.len(),
            architecture: options.architecture.clone(),
            parameters: options.parameters.clone(),
            quantization: options.quantization.clone(),
            added_at: Utc::now(),
        };
        self.store.save(&manifest)?;
        tracing::info!(model = name, path = %manifest.path.display(), size = manifest.size, "model registered");
        Ok(manifest)
    }

    pub fn get(&self, name: &str) -> Result<ModelManifest, ResolveError> {
        self.store.load(name)
    }

    /// All registered manifests, in no particular order.
    pub fn list(&self) -> Result<Vec<ModelManifest>, ResolveError> {
        self.store.list()
    }

    /// Delete the manifest for `name`. The model file itself is left alone.
    pub fn remove(&self, name: &str) -> Result<(), ResolveError> {
        self.store.delete(name)?;
        tracing::info!(model = name, "model removed");
        Ok(())
    }
}
