//! Generation parameters and per-call options.
//!
//! All fields have safe defaults. Options are validated before they are
//! converted into the native parameter block.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use crate::ffi::RawParams;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateParameters {
    /// Maximum units to produce.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = greedy).
    pub temperature: f32,
    /// Top-k limit (0 = disabled).
    pub top_k: u32,
    /// Nucleus threshold in (0.0, 1.0].
    pub top_p: f32,
    /// Repetition penalty (1.0 = none).
    pub repetition_penalty: f32,
    /// RNG seed (0 = engine chooses).
    pub seed: u64,
}

impl Default for GenerateParameters {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            repetition_penalty: 1.1,
            seed: 0,
        }
    }
}

impl GenerateParameters {
    /// Validate parameter ranges. Returns error on invalid values.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_tokens == 0 {
            return Err(EngineError::InvalidOptions("max_tokens must be > 0".into()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(EngineError::InvalidOptions("temperature must be >= 0".into()));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(EngineError::InvalidOptions("top_p must be in (0, 1]".into()));
        }
        if !self.repetition_penalty.is_finite() || self.repetition_penalty < 1.0 {
            return Err(EngineError::InvalidOptions(
                "repetition_penalty must be >= 1.0".into(),
            ));
        }
        Ok(())
    }

    fn to_raw(self, repetition_penalty: f32) -> RawParams {
        RawParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            repetition_penalty,
            seed: self.seed,
        }
    }
}

/// Parameters plus the sampler pipeline selection for one call.
///
/// The full-text path runs a repetition-penalty stage; the streaming path
/// does not have one. `repetition_penalty_stage` makes that explicit:
/// `None` keeps each path's default, `Some(false)` switches the stage off on
/// the full-text path, and `Some(true)` is refused on the streaming path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerateOptions {
    pub params: GenerateParameters,
    pub repetition_penalty_stage: Option<bool>,
}

impl GenerateOptions {
    pub fn new(params: GenerateParameters) -> Self {
        Self {
            params,
            repetition_penalty_stage: None,
        }
    }

    pub fn with_repetition_penalty_stage(mut self, enabled: bool) -> Self {
        self.repetition_penalty_stage = Some(enabled);
        self
    }

    /// Native parameters for the full-text path.
    pub fn to_raw_sync(&self) -> Result<RawParams, EngineError> {
        self.params.validate()?;
        let penalty = if self.repetition_penalty_stage.unwrap_or(true) {
            self.params.repetition_penalty
        } else {
            1.0
        };
        Ok(self.params.to_raw(penalty))
    }

    /// Native parameters for the streaming path.
    pub fn to_raw_streaming(&self) -> Result<RawParams, EngineError> {
        self.params.validate()?;
        if self.repetition_penalty_stage == Some(true) {
            return Err(EngineError::InvalidOptions(
                "the streaming pipeline has no repetition-penalty stage".into(),
            ));
        }
        Ok(self.params.to_raw(1.0))
    }
}
