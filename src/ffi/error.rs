// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Errors surfaced by the native handle bridge.

use thiserror::Error;

use super::types::NativeStatus;

/// A non-OK status from the engine, paired with the calling thread's diagnostic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct BridgeError {
    pub status: NativeStatus,
    pub message: String,
}

impl BridgeError {
    pub fn new(status: NativeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(NativeStatus::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(NativeStatus::Internal, message)
    }
}
