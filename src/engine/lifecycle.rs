//! Context lifecycle management.
//!
//! A [`ContextManager`] owns exactly one native context and tracks which
//! model it holds:
//!
//! ```text
//! create() -> Unloaded --load--> Loaded(model) --load--> Loaded(other)
//!                                   |  ^
//!                                   +--+ reset (model kept)
//! any --close--> Closed (terminal)
//! ```
//!
//! Generation is refused while `Unloaded` or `Closed` without touching the
//! engine. A failed load leaves the state as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::error::EngineError;
use super::options::GenerateOptions;
use crate::ffi::{Backend, NativeApi, NativeContext};

/// Where the context is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextState {
    Unloaded,
    Loaded { model: String, path: PathBuf },
    Closed,
}

/// Snapshot of the engine state, shared read-only with observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineState {
    pub loaded: bool,
    pub model: Option<String>,
}

/// Single-owner driver for one native context.
pub struct ContextManager {
    context: NativeContext,
    state: ContextState,
    shared: Arc<RwLock<EngineState>>,
}

impl ContextManager {
    /// Create the native context. The manager starts `Unloaded`.
    pub fn create(api: NativeApi, backend: Backend) -> Result<Self, EngineError> {
        let context = NativeContext::create(api, backend)?;
        Ok(Self {
            context,
            state: ContextState::Unloaded,
            shared: Arc::new(RwLock::new(EngineState::default())),
        })
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// Identifier of the loaded model, if any.
    pub fn loaded_model(&self) -> Option<&str> {
        match &self.state {
            ContextState::Loaded { model, .. } => Some(model),
            _ => None,
        }
    }

    /// Handle to the state snapshot, updated on every transition.
    pub fn shared_state(&self) -> Arc<RwLock<EngineState>> {
        Arc::clone(&self.shared)
    }

    /// Load `path`, using the path itself as the model identifier.
    pub fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let model = path.display().to_string();
        self.load_as(&model, path)
    }

    /// Load `path` and record it under `model`.
    pub fn load_as(&mut self, model: &str, path: &Path) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.context.load(path)?;
        self.transition(ContextState::Loaded {
            model: model.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Clear sequence state. The loaded model and its identifier are kept.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.context.reset()?;
        Ok(())
    }

    /// Full-text generation with the repetition-penalty stage by default.
    pub fn generate(&mut self, prompt: &str, options: &GenerateOptions) -> Result<String, EngineError> {
        self.ensure_loaded()?;
        let params = options.to_raw_sync()?;
        Ok(self.context.generate(prompt, &params)?)
    }

    /// Streaming generation. `on_unit` receives each unit as it is produced
    /// and returns `false` to stop early.
    pub fn generate_streaming<F>(
        &mut self,
        prompt: &str,
        options: &GenerateOptions,
        on_unit: F,
    ) -> Result<(), EngineError>
    where
        F: FnMut(&str) -> bool + Send + 'static,
    {
        self.ensure_loaded()?;
        let params = options.to_raw_streaming()?;
        Ok(self.context.generate_streaming(prompt, &params, on_unit)?)
    }

    /// Destroy the native context. Every later operation fails with `Closed`.
    pub fn close(&mut self) {
        if self.state != ContextState::Closed {
            self.context.destroy();
            self.transition(ContextState::Closed);
            tracing::info!("engine context closed");
        }
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.state == ContextState::Closed {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        match self.state {
            ContextState::Loaded { .. } => Ok(()),
            ContextState::Unloaded => Err(EngineError::NotLoaded),
            ContextState::Closed => Err(EngineError::Closed),
        }
    }

    fn transition(&mut self, next: ContextState) {
        let snapshot = match &next {
            ContextState::Loaded { model, .. } => EngineState {
                loaded: true,
                model: Some(model.clone()),
            },
            _ => EngineState::default(),
        };
        self.state = next;
        *self.shared.write() = snapshot;
    }
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("context", &self.context)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::stub::STUB_API;
    use crate::ffi::NativeStatus;
    use std::io::Write;

    fn model_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"weights").unwrap();
        file
    }

    fn manager() -> ContextManager {
        ContextManager::create(STUB_API, Backend::Cpu).unwrap()
    }

    #[test]
    fn test_starts_unloaded() {
        let mgr = manager();
        assert_eq!(mgr.state(), &ContextState::Unloaded);
        assert_eq!(mgr.loaded_model(), None);
        assert!(!mgr.shared_state().read().loaded);
    }

    #[test]
    fn test_generate_while_unloaded_is_precondition() {
        let mut mgr = manager();
        let err = mgr.generate("hi", &GenerateOptions::default()).unwrap_err();
        assert!(err.is_precondition());

        let err = mgr
            .generate_streaming("hi", &GenerateOptions::default(), |_| true)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotLoaded));
    }

    #[test]
    fn test_load_updates_state_and_snapshot() {
        let file = model_file();
        let mut mgr = manager();
        mgr.load_as("tiny", file.path()).unwrap();

        assert_eq!(mgr.loaded_model(), Some("tiny"));
        let snapshot = mgr.shared_state().read().clone();
        assert_eq!(
            snapshot,
            EngineState {
                loaded: true,
                model: Some("tiny".into())
            }
        );
    }

    #[test]
    fn test_load_defaults_identifier_to_path() {
        let file = model_file();
        let mut mgr = manager();
        mgr.load(file.path()).unwrap();
        assert_eq!(mgr.loaded_model(), Some(file.path().display().to_string().as_str()));
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let file = model_file();
        let mut mgr = manager();
        mgr.load_as("tiny", file.path()).unwrap();

        let err = mgr.load_as("ghost", Path::new("/no/such/model.gguf")).unwrap_err();
        match err {
            EngineError::Native(e) => assert_eq!(e.status, NativeStatus::ModelLoad),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mgr.loaded_model(), Some("tiny"));
    }

    #[test]
    fn test_reset_keeps_identifier() {
        let file = model_file();
        let mut mgr = manager();
        assert!(matches!(mgr.reset(), Err(EngineError::NotLoaded)));

        mgr.load_as("tiny", file.path()).unwrap();
        mgr.reset().unwrap();
        assert_eq!(mgr.loaded_model(), Some("tiny"));
    }

    #[test]
    fn test_sync_and_streaming_pipelines_differ() {
        let file = model_file();
        let mut mgr = manager();
        mgr.load_as("tiny", file.path()).unwrap();

        let text = mgr.generate("a a b", &GenerateOptions::default()).unwrap();
        assert_eq!(text, "a b ");

        let units = Arc::new(parking_lot::Mutex::new(String::new()));
        let sink = Arc::clone(&units);
        mgr.generate_streaming("a a b", &GenerateOptions::default(), move |unit: &str| {
            sink.lock().push_str(unit);
            true
        })
        .unwrap();
        assert_eq!(*units.lock(), "a a b ");
    }

    #[test]
    fn test_close_is_terminal() {
        let file = model_file();
        let mut mgr = manager();
        mgr.load_as("tiny", file.path()).unwrap();
        mgr.close();
        mgr.close();

        assert_eq!(mgr.state(), &ContextState::Closed);
        assert!(!mgr.shared_state().read().loaded);
        assert!(matches!(mgr.load(file.path()), Err(EngineError::Closed)));
        assert!(matches!(mgr.reset(), Err(EngineError::Closed)));
        assert!(matches!(
            mgr.generate("hi", &GenerateOptions::default()),
            Err(EngineError::Closed)
        ));
    }
}
