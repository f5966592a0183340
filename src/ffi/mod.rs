// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bridge to the native inference engine.
//!
//! - [`NativeContext`]: single-owner handle with status translation
//! - [`callback`]: token table and trampoline for streaming units
//! - [`NativeApi`]: the function table the bridge calls through

pub mod callback;
mod error;
mod handle;
#[cfg(feature = "native")]
pub mod linked;
pub mod stub;
mod types;

pub use callback::{CallbackToken, Registration};
pub use error::BridgeError;
pub use handle::{ContextId, NativeContext};
pub use types::{Backend, NativeApi, NativeStatus, RawContext, RawParams, UnitCallback};

/// Function table used when none is given explicitly.
#[cfg(feature = "native")]
pub fn default_api() -> NativeApi {
    linked::API
}

/// Function table used when none is given explicitly.
#[cfg(not(feature = "native"))]
pub fn default_api() -> NativeApi {
    stub::STUB_API
}
