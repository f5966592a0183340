// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Function table bound to the native `ir_ffi` library.

use std::ffi::{c_char, c_void};

use super::types::{NativeApi, RawContext, RawParams, UnitCallback};

#[link(name = "ir_ffi")]
extern "C" {
    fn ir_context_create(backend: i32, out: *mut *mut RawContext) -> i32;
    fn ir_context_destroy(ctx: *mut RawContext) -> i32;
    fn ir_model_load(ctx: *mut RawContext, path: *const c_char) -> i32;
    fn ir_generate(
        ctx: *mut RawContext,
        prompt: *const c_char,
        params: RawParams,
        out: *mut *mut c_char,
    ) -> i32;
    fn ir_generate_streaming(
        ctx: *mut RawContext,
        prompt: *const c_char,
        params: RawParams,
        callback: UnitCallback,
        user_data: *mut c_void,
    ) -> i32;
    fn ir_reset(ctx: *mut RawContext) -> i32;
    fn ir_last_error() -> *const c_char;
    fn ir_free_string(s: *mut c_char);
}

/// Function table for the linked engine.
pub const API: NativeApi = NativeApi {
    create: ir_context_create,
    destroy: ir_context_destroy,
    load: ir_model_load,
    generate: ir_generate,
    generate_streaming: ir_generate_streaming,
    reset: ir_reset,
    last_error: ir_last_error,
    free_string: ir_free_string,
};
