// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process reference engine exposing the native ABI.
//!
//! Used when the crate is built without the `native` feature and by tests.
//! It honors the same contract as the real engine: status codes, a
//! thread-scoped pre-consumed last error, receiver-owned output strings and a
//! per-unit callback with continue/stop answers. Instead of running a model it
//! echoes the prompt's whitespace-separated words, one unit per word.

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

use super::types::{NativeApi, NativeStatus, RawContext, RawParams, UnitCallback};

/// Function table backed by the reference engine.
pub const STUB_API: NativeApi = NativeApi {
    create: stub_create,
    destroy: stub_destroy,
    load: stub_load,
    generate: stub_generate,
    generate_streaming: stub_generate_streaming,
    reset: stub_reset,
    last_error: stub_last_error,
    free_string: stub_free_string,
};

struct StubContext {
    model: Option<PathBuf>,
}

thread_local! {
    static PENDING_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
    // Keeps the most recently handed-out message alive for the caller.
    static HANDED_OUT: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_error(message: impl Into<String>) {
    let message = message.into().replace('\0', " ");
    let c = CString::new(message).unwrap_or_default();
    PENDING_ERROR.with(|slot| *slot.borrow_mut() = Some(c));
}

fn fail(status: NativeStatus, message: impl Into<String>) -> i32 {
    set_error(message);
    status.as_raw()
}

fn guarded(body: impl FnOnce() -> i32) -> i32 {
    panic::catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|_| fail(NativeStatus::Internal, "internal panic"))
}

unsafe fn context<'a>(ctx: *mut RawContext) -> Option<&'a mut StubContext> {
    (ctx as *mut StubContext).as_mut()
}

unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

/// Units for one generation call. `penalize` drops immediate repeats.
fn produce(prompt: &str, params: &RawParams, penalize: bool) -> Vec<String> {
    let mut units = Vec::new();
    let mut previous: Option<&str> = None;
    for word in prompt.split_whitespace() {
        if units.len() >= params.max_tokens as usize {
            break;
        }
        if penalize && previous == Some(word) {
            continue;
        }
        units.push(format!("{} ", word));
        previous = Some(word);
    }
    units
}

unsafe extern "C" fn stub_create(backend: i32, out: *mut *mut RawContext) -> i32 {
    guarded(|| {
        if out.is_null() {
            return fail(NativeStatus::InvalidArgument, "null output pointer");
        }
        if backend != 0 {
            return fail(
                NativeStatus::InvalidArgument,
                format!("backend {} is not supported by the reference engine", backend),
            );
        }
        let ctx = Box::new(StubContext { model: None });
        *out = Box::into_raw(ctx) as *mut RawContext;
        NativeStatus::Ok.as_raw()
    })
}

unsafe extern "C" fn stub_destroy(ctx: *mut RawContext) -> i32 {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx as *mut StubContext));
    }
    NativeStatus::Ok.as_raw()
}

unsafe extern "C" fn stub_load(ctx: *mut RawContext, path: *const c_char) -> i32 {
    guarded(|| {
        let Some(ctx) = context(ctx) else {
            return fail(NativeStatus::InvalidArgument, "null context");
        };
        let Some(path) = read_str(path) else {
            return fail(NativeStatus::InvalidArgument, "invalid model path");
        };
        let path = PathBuf::from(path);
        if !path.is_file() {
            return fail(
                NativeStatus::ModelLoad,
                format!("cannot open model file: {}", path.display()),
            );
        }
        ctx.model = Some(path);
        NativeStatus::Ok.as_raw()
    })
}

unsafe extern "C" fn stub_generate(
    ctx: *mut RawContext,
    prompt: *const c_char,
    params: RawParams,
    out: *mut *mut c_char,
) -> i32 {
    guarded(|| {
        let Some(ctx) = context(ctx) else {
            return fail(NativeStatus::InvalidArgument, "null context");
        };
        if out.is_null() {
            return fail(NativeStatus::InvalidArgument, "null argument");
        }
        let Some(prompt) = read_str(prompt) else {
            return fail(NativeStatus::InvalidArgument, "invalid prompt");
        };
        if ctx.model.is_none() {
            return fail(NativeStatus::InvalidArgument, "no model loaded");
        }
        if prompt.split_whitespace().next().is_none() {
            return fail(NativeStatus::Generate, "prompt produced no tokens");
        }

        let units = produce(prompt, &params, params.repetition_penalty > 1.0);
        let text = CString::new(units.concat()).unwrap_or_default();
        *out = text.into_raw();
        NativeStatus::Ok.as_raw()
    })
}

unsafe extern "C" fn stub_generate_streaming(
    ctx: *mut RawContext,
    prompt: *const c_char,
    params: RawParams,
    callback: UnitCallback,
    user_data: *mut c_void,
) -> i32 {
    guarded(|| {
        let Some(ctx) = context(ctx) else {
            return fail(NativeStatus::InvalidArgument, "null context");
        };
        let Some(prompt) = read_str(prompt) else {
            return fail(NativeStatus::InvalidArgument, "invalid prompt");
        };
        if ctx.model.is_none() {
            return fail(NativeStatus::InvalidArgument, "no model loaded");
        }
        if prompt.split_whitespace().next().is_none() {
            return fail(NativeStatus::Generate, "prompt produced no tokens");
        }

        // The streaming pipeline has no repetition-penalty stage.
        let units = produce(prompt, &params, false);
        for unit in units {
            let Ok(c) = CString::new(unit) else {
                continue;
            };
            if !callback(c.as_ptr(), user_data) {
                break;
            }
        }
        NativeStatus::Ok.as_raw()
    })
}

unsafe extern "C" fn stub_reset(ctx: *mut RawContext) -> i32 {
    guarded(|| {
        let Some(ctx) = context(ctx) else {
            return fail(NativeStatus::InvalidArgument, "null context");
        };
        // Each generation prefills from position zero, so there is no
        // sequence state to drop beyond checking a model is present.
        if ctx.model.is_none() {
            return fail(NativeStatus::InvalidArgument, "no model loaded");
        }
        NativeStatus::Ok.as_raw()
    })
}

/// Moves the pending message into the handed-out slot. The returned pointer
/// stays valid until the next call on this thread and must not be freed.
unsafe extern "C" fn stub_last_error() -> *const c_char {
    let pending = PENDING_ERROR.with(|slot| slot.borrow_mut().take());
    match pending {
        Some(message) => HANDED_OUT.with(|slot| {
            let mut slot = slot.borrow_mut();
            *slot = Some(message);
            slot.as_ref().map_or(ptr::null(), |m| m.as_ptr())
        }),
        None => ptr::null(),
    }
}

unsafe extern "C" fn stub_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
