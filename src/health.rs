//! Health reporting for the gateway.
//!
//! Combines the shutdown state with the engine snapshot. Reading it never
//! takes the engine lock, so health stays responsive during long
//! generations.

use serde::{Deserialize, Serialize};

use crate::engine::EngineState;
use crate::shutdown::ShutdownState;

/// Overall status reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Draining,
    Stopped,
}

impl From<ShutdownState> for HealthStatus {
    fn from(state: ShutdownState) -> Self {
        match state {
            ShutdownState::Running => Self::Ok,
            ShutdownState::Draining => Self::Draining,
            ShutdownState::Stopped => Self::Stopped,
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl HealthReport {
    pub fn new(shutdown: ShutdownState, engine: &EngineState) -> Self {
        Self {
            status: shutdown.into(),
            model_loaded: engine.loaded,
            model: engine.model.clone(),
        }
    }

    /// Accepting traffic.
    pub fn is_ready(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
