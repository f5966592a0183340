//! IR Gateway
//!
//! A local HTTP serving gateway in front of a native inference engine.
//!
//! # Layers
//!
//! - [`ffi`]: owns the native context handle and bridges streamed units
//!   from the engine's callback into Rust closures
//! - [`engine`]: context lifecycle (`Unloaded -> Loaded -> Closed`) and
//!   generation options
//! - [`models`]: resolves a model name or path to a file via persisted
//!   manifests
//! - [`server`]: the gateway and its HTTP API (`/api/generate`, `/api/chat`,
//!   `/api/tags`, `/api/delete`, `/api/health`)
//! - [`cli`]: the `ir` command line
//!
//! # Concurrency
//!
//! One engine context serves every request. Each request holds the engine
//! lock from ensure-model to the end of generation, so a model swap never
//! happens under a running generation.

pub mod cli;
pub mod config;
pub mod engine;
pub mod ffi;
pub mod health;
pub mod models;
pub mod server;
pub mod shutdown;
pub mod telemetry;

pub use config::EnvConfig;
pub use server::{AppState, Gateway};
pub use shutdown::ShutdownCoordinator;
