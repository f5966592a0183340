//! On-disk manifest store.
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/models/manifests/<name>.json
//! <base>/models/blobs/
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::error::ResolveError;
use super::manifest::{validate_name, ModelManifest};

/// Directory-backed manifest storage.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    base_dir: PathBuf,
}

impl ManifestStore {
    /// Open the store, creating its directories if needed.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, ResolveError> {
        let store = Self {
            base_dir: base_dir.into(),
        };
        std::fs::create_dir_all(store.manifests_dir())?;
        std::fs::create_dir_all(store.blobs_dir())?;
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.base_dir.join("models").join("manifests")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.base_dir.join("models").join("blobs")
    }

    fn manifest_path(&self, name: &str) -> PathBuf {
        self.manifests_dir().join(format!("{}.json", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.manifest_path(name).is_file()
    }

    /// Write `manifest`, replacing any record with the same name.
    pub fn save(&self, manifest: &ModelManifest) -> Result<(), ResolveError> {
        validate_name(&manifest.name)?;
        let json = manifest.to_json()?;
        std::fs::write(self.manifest_path(&manifest.name), json)?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<ModelManifest, ResolveError> {
        validate_name(name)?;
        let path = self.manifest_path(name);
        if !path.is_file() {
            return Err(ResolveError::UnknownModel(name.to_string()));
        }
        ModelManifest::from_file(&path)
    }

    pub fn delete(&self, name: &str) -> Result<(), ResolveError> {
        validate_name(name)?;
        match std::fs::remove_file(self.manifest_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ResolveError::UnknownModel(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All readable manifests. Non-JSON and unreadable entries are skipped;
    /// a missing directory yields an empty list.
    pub fn list(&self) -> Result<Vec<ModelManifest>, ResolveError> {
        let entries = match std::fs::read_dir(self.manifests_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut manifests = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match ModelManifest::from_file(&path) {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping manifest");
                }
            }
        }
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manifest(name: &str) -> ModelManifest {
        ModelManifest {
            name: name.into(),
            path: PathBuf::from(format!("/models/{}.gguf", name)),
            size: 10,
            architecture: None,
            parameters: None,
            quantization: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        assert!(store.manifests_dir().is_dir());
        assert!(store.blobs_dir().is_dir());
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();

        store.save(&manifest("tiny")).unwrap();
        assert!(store.contains("tiny"));
        assert_eq!(store.load("tiny").unwrap().size, 10);

        store.delete("tiny").unwrap();
        assert!(!store.contains("tiny"));
        assert!(matches!(store.delete("tiny"), Err(ResolveError::UnknownModel(_))));
    }

    #[test]
    fn test_list_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        store.save(&manifest("a")).unwrap();
        store.save(&manifest("b")).unwrap();
        std::fs::write(store.manifests_dir().join("notes.txt"), "hello").unwrap();
        std::fs::write(store.manifests_dir().join("broken.json"), "{").unwrap();

        let mut names: Vec<_> = store.list().unwrap().into_iter().map(|m| m.name).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        std::fs::remove_dir_all(store.manifests_dir()).unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
