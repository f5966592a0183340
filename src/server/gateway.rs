//! Serving gateway: admission, model swaps and generation over one engine.
//!
//! Every request takes the engine lock for its whole lifecycle, covering
//! ensure-model and the generation call itself. Requests are therefore fully
//! serialized against the single native context: a swap can never happen
//! under a running generation and two generations never share sequence
//! state. The lock is only ever taken on blocking threads.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::EnvConfig;
use crate::engine::{ContextManager, ContextState, EngineError, EngineState, GenerateOptions};
use crate::ffi::NativeApi;
use crate::models::{ModelResolver, ResolveError};
use crate::telemetry;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to load model '{model}': {source}")]
    Load {
        model: String,
        #[source]
        source: EngineError,
    },

    #[error("engine worker failed: {0}")]
    Worker(String),
}

/// Shared front door to the engine. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    engine: Arc<Mutex<ContextManager>>,
    resolver: Arc<ModelResolver>,
    state: Arc<RwLock<EngineState>>,
    stream_buffer: usize,
}

impl Gateway {
    pub fn new(engine: ContextManager, resolver: ModelResolver, stream_buffer: usize) -> Self {
        let state = engine.shared_state();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            resolver: Arc::new(resolver),
            state,
            stream_buffer: stream_buffer.max(1),
        }
    }

    /// Open the manifest store and create the engine context from `config`.
    pub fn from_config(config: &EnvConfig, api: NativeApi) -> Result<Self, GatewayError> {
        let resolver = ModelResolver::open(&config.base_dir)?;
        let engine = ContextManager::create(api, config.backend)?;
        Ok(Self::new(engine, resolver, config.stream_buffer))
    }

    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Current engine snapshot. Does not wait for the engine lock.
    pub fn engine_state(&self) -> EngineState {
        self.state.read().clone()
    }

    /// Make sure `model` is the loaded model, loading or swapping if needed.
    pub async fn ensure_model(&self, model: &str) -> Result<(), GatewayError> {
        let model = model.to_string();
        self.run_locked(move |engine, resolver| ensure_model(engine, resolver, &model))
            .await
    }

    /// Full-text generation against `model`.
    pub async fn generate(
        &self,
        model: &str,
        prompt: String,
        options: GenerateOptions,
    ) -> Result<String, GatewayError> {
        options.to_raw_sync()?;
        let model = model.to_string();
        self.run_locked(move |engine, resolver| {
            ensure_model(engine, resolver, &model)?;
            Ok(engine.generate(&prompt, &options)?)
        })
        .await
    }

    /// Streaming generation against `model`.
    ///
    /// Resolves once the model is in place; errors up to that point are
    /// returned here. The receiver then yields units until generation
    /// finishes, fails or is stopped by dropping the receiver. Failures after
    /// that point are logged and simply end the stream.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: String,
        options: GenerateOptions,
    ) -> Result<mpsc::Receiver<String>, GatewayError> {
        options.to_raw_streaming()?;

        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), GatewayError>>();
        let (unit_tx, unit_rx) = mpsc::channel::<String>(self.stream_buffer);
        let engine = Arc::clone(&self.engine);
        let resolver = Arc::clone(&self.resolver);
        let model = model.to_string();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let mut engine = engine.lock();

            if let Err(e) = ensure_model(&mut *engine, &*resolver, &model) {
                let _ = ready_tx.send(Err(e));
                return;
            }
            if ready_tx.send(Ok(())).is_err() {
                return;
            }

            let result = engine.generate_streaming(&prompt, &options, move |unit| {
                // A closed channel means the client is gone: stop generating.
                unit_tx.blocking_send(unit.to_string()).is_ok()
            });
            if let Err(e) = result {
                tracing::error!(model = %model, error = %e, "streaming generation failed");
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(unit_rx),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GatewayError::Worker("engine worker exited early".into())),
        }
    }

    /// Clear the loaded model's sequence state. No-op when nothing is loaded.
    pub async fn reset(&self) -> Result<(), GatewayError> {
        self.run_locked(|engine, _| {
            if engine.loaded_model().is_some() {
                engine.reset()?;
            }
            Ok(())
        })
        .await
    }

    /// Destroy the engine context. Waits for the running request, if any.
    pub async fn close(&self) {
        let _ = self
            .run_locked(|engine, _| {
                engine.close();
                Ok(())
            })
            .await;
    }

    async fn run_locked<T, F>(&self, work: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ContextManager, &ModelResolver) -> Result<T, GatewayError> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let resolver = Arc::clone(&self.resolver);
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let mut engine = engine.lock();
            work(&mut *engine, &*resolver)
        })
        .await
        .map_err(|e| GatewayError::Worker(e.to_string()))?
    }
}

/// Load `model` unless it is already loaded from the path it resolves to
/// now. Caller holds the engine lock.
///
/// The identifier is resolved on every call, so a model removed from the
/// registry stops being served even while its weights stay resident.
fn ensure_model(
    engine: &mut ContextManager,
    resolver: &ModelResolver,
    model: &str,
) -> Result<(), GatewayError> {
    let path = resolver.resolve(model)?;
    if let ContextState::Loaded {
        model: loaded,
        path: loaded_path,
    } = engine.state()
    {
        if loaded == model && *loaded_path == path {
            return Ok(());
        }
    }

    let load_failed = |source| GatewayError::Load {
        model: model.to_string(),
        source,
    };
    let previous = engine.loaded_model().map(str::to_string);
    if previous.is_some() {
        engine.reset().map_err(load_failed)?;
    }

    let started = Instant::now();
    engine.load_as(model, &path).map_err(load_failed)?;
    telemetry::record_model_load(started.elapsed());
    tracing::info!(
        model,
        path = %path.display(),
        previous = previous.as_deref().unwrap_or("-"),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "model loaded"
    );
    Ok(())
}
