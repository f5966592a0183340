// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! C ABI types shared with the native inference engine.

use std::ffi::{c_char, c_void};
use std::fmt;
use std::str::FromStr;

/// Opaque native context. Only ever handled behind a pointer.
#[repr(C)]
pub struct RawContext {
    _private: [u8; 0],
}

/// Generation parameters as laid out across the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub seed: u64,
}

/// Per-unit callback invoked by the engine. Returning `false` stops generation.
pub type UnitCallback = extern "C" fn(unit: *const c_char, user_data: *mut c_void) -> bool;

/// Function table for one native engine implementation.
///
/// Every entry returns a raw status code (see [`NativeStatus`]) except
/// `last_error` and `free_string`. Generation parameters are passed by value.
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub create: unsafe extern "C" fn(backend: i32, out: *mut *mut RawContext) -> i32,
    pub destroy: unsafe extern "C" fn(ctx: *mut RawContext) -> i32,
    pub load: unsafe extern "C" fn(ctx: *mut RawContext, path: *const c_char) -> i32,
    pub generate: unsafe extern "C" fn(
        ctx: *mut RawContext,
        prompt: *const c_char,
        params: RawParams,
        out: *mut *mut c_char,
    ) -> i32,
    pub generate_streaming: unsafe extern "C" fn(
        ctx: *mut RawContext,
        prompt: *const c_char,
        params: RawParams,
        callback: UnitCallback,
        user_data: *mut c_void,
    ) -> i32,
    pub reset: unsafe extern "C" fn(ctx: *mut RawContext) -> i32,
    pub last_error: unsafe extern "C" fn() -> *const c_char,
    pub free_string: unsafe extern "C" fn(s: *mut c_char),
}

impl fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeApi").finish_non_exhaustive()
    }
}

/// Status codes returned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Ok,
    InvalidArgument,
    ModelLoad,
    Generate,
    OutOfMemory,
    Internal,
}

impl NativeStatus {
    /// Map a raw code. Codes outside the known set are treated as internal faults.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::InvalidArgument,
            2 => Self::ModelLoad,
            3 => Self::Generate,
            4 => Self::OutOfMemory,
            _ => Self::Internal,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::InvalidArgument => 1,
            Self::ModelLoad => 2,
            Self::Generate => 3,
            Self::OutOfMemory => 4,
            Self::Internal => 5,
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::InvalidArgument => "invalid argument",
            Self::ModelLoad => "model load error",
            Self::Generate => "generate error",
            Self::OutOfMemory => "out of memory",
            Self::Internal => "internal error",
        };
        f.write_str(text)
    }
}

/// Compute backend selected when the context is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Cpu,
    Metal,
}

impl Backend {
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Cpu => 0,
            Self::Metal => 1,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Metal => f.write_str("metal"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "metal" => Ok(Self::Metal),
            other => Err(format!("unknown backend '{}', expected 'cpu' or 'metal'", other)),
        }
    }
}
