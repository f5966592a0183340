//! Persisted model manifests.
//!
//! One JSON record per registered model, keyed by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ResolveError;

/// Metadata for one registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Unique key (e.g., "tiny-llama").
    pub name: String,
    /// Absolute path to the model file.
    pub path: PathBuf,
    /// Size in bytes at registration time.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl ModelManifest {
    /// Load a manifest from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ResolveError> {
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_json(&content).map_err(|reason| ResolveError::Manifest { name, reason })
    }

    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid manifest JSON: {}", e))
    }

    /// Pretty-printed JSON for persistence.
    pub fn to_json(&self) -> Result<String, ResolveError> {
        serde_json::to_string_pretty(self).map_err(|e| ResolveError::Manifest {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

/// Check that `name` is usable as a manifest key and file stem.
pub fn validate_name(name: &str) -> Result<(), ResolveError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(ResolveError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let manifest = ModelManifest {
            name: "tiny".into(),
            path: PathBuf::from("/models/tiny.gguf"),
            size: 4096,
            architecture: None,
            parameters: None,
            quantization: Some("Q4_0".into()),
            added_at: Utc::now(),
        };
        let json = manifest.to_json().unwrap();
        assert!(!json.contains("architecture"));
        assert!(json.contains("\"quantization\": \"Q4_0\""));

        let parsed = ModelManifest::from_json(&json).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(ModelManifest::from_json("{not json").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("tiny-llama").is_ok());
        assert!(validate_name("qwen2.5:0.5b").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }
}
