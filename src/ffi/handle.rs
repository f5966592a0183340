// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Owned handle to one native engine context.
//!
//! # String ownership
//!
//! Ownership differs per operation and is not uniform across the ABI:
//!
//! | Operation | String | Released by |
//! |---|---|---|
//! | `generate` | output text | this bridge, via `free_string`, exactly once |
//! | `generate_streaming` | each unit | the engine; valid only during the callback |
//! | `last_error` | diagnostic | the engine; already consumed, never freed here |
//! | `load`, `generate*` | path, prompt | this bridge; the engine copies what it keeps |
//!
//! Every string that comes back is copied into an owned `String` before the
//! bridge releases it or returns.

use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};

use super::callback::{self, trampoline};
use super::error::BridgeError;
use super::types::{Backend, NativeApi, NativeStatus, RawContext, RawParams};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier for a context. The raw address is never exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Exclusive owner of one native context.
///
/// Destruction is guarded by taking the pointer, so it happens at most once
/// whether triggered by [`NativeContext::destroy`] or by drop. Any call after
/// destruction fails with `InvalidArgument` without reaching the engine.
pub struct NativeContext {
    api: NativeApi,
    raw: Option<NonNull<RawContext>>,
    id: ContextId,
}

// SAFETY: the engine allows a context to be used from any thread as long as
// calls are not concurrent. `&mut self` on every call enforces that; the type
// is deliberately not `Sync`.
unsafe impl Send for NativeContext {}

impl NativeContext {
    /// Create a context on `backend`.
    pub fn create(api: NativeApi, backend: Backend) -> Result<Self, BridgeError> {
        let mut out: *mut RawContext = ptr::null_mut();
        // SAFETY: `out` is a valid location for the engine to write into.
        let code = unsafe { (api.create)(backend.as_raw(), &mut out) };
        check(&api, code)?;

        let raw = NonNull::new(out)
            .ok_or_else(|| BridgeError::internal("engine returned a null context"))?;
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(context_id = id.0, %backend, "native context created");

        Ok(Self {
            api,
            raw: Some(raw),
            id,
        })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.raw.is_some()
    }

    /// Load model weights from `path`.
    pub fn load(&mut self, path: &Path) -> Result<(), BridgeError> {
        let ctx = self.live()?;
        let path = path
            .to_str()
            .ok_or_else(|| BridgeError::invalid_argument("model path is not valid UTF-8"))?;
        let path = to_cstring(path, "model path")?;
        // SAFETY: `ctx` is live and `path` outlives the call.
        let code = unsafe { (self.api.load)(ctx, path.as_ptr()) };
        check(&self.api, code)
    }

    /// Run a full generation and return the produced text.
    pub fn generate(&mut self, prompt: &str, params: &RawParams) -> Result<String, BridgeError> {
        let ctx = self.live()?;
        let prompt = to_cstring(prompt, "prompt")?;
        let mut out: *mut c_char = ptr::null_mut();
        // SAFETY: all pointers are valid for the duration of the call.
        let code = unsafe { (self.api.generate)(ctx, prompt.as_ptr(), *params, &mut out) };
        check(&self.api, code)?;

        if out.is_null() {
            return Err(BridgeError::internal("engine returned no output"));
        }
        // SAFETY: on success `out` is a NUL-terminated string owned by us.
        let text = unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned();
        // SAFETY: released exactly once, through the engine's allocator.
        unsafe { (self.api.free_string)(out) };
        Ok(text)
    }

    /// Run a streaming generation, handing each unit to `on_unit`.
    ///
    /// `on_unit` returning `false` stops generation early; that is not an
    /// error. A panic inside `on_unit` is contained and reported as
    /// `Internal`.
    pub fn generate_streaming<F>(
        &mut self,
        prompt: &str,
        params: &RawParams,
        on_unit: F,
    ) -> Result<(), BridgeError>
    where
        F: FnMut(&str) -> bool + Send + 'static,
    {
        let ctx = self.live()?;
        let prompt = to_cstring(prompt, "prompt")?;

        let registration = callback::register(on_unit);
        // SAFETY: `ctx` is live; `registration` keeps the token valid until
        // after the engine returns.
        let code = unsafe {
            (self.api.generate_streaming)(
                ctx,
                prompt.as_ptr(),
                *params,
                trampoline,
                registration.user_data(),
            )
        };
        let faulted = registration.faulted();
        drop(registration);

        check(&self.api, code)?;
        if faulted {
            return Err(BridgeError::internal("streaming callback panicked"));
        }
        Ok(())
    }

    /// Clear sequence state, keeping the loaded model.
    pub fn reset(&mut self) -> Result<(), BridgeError> {
        let ctx = self.live()?;
        // SAFETY: `ctx` is live.
        let code = unsafe { (self.api.reset)(ctx) };
        check(&self.api, code)
    }

    /// Release the native context. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(raw) = self.raw.take() {
            // SAFETY: the pointer came from `create` and was taken out of
            // `self.raw`, so it cannot be released twice.
            let code = unsafe { (self.api.destroy)(raw.as_ptr()) };
            if code != NativeStatus::Ok.as_raw() {
                tracing::warn!(
                    context_id = self.id.0,
                    code,
                    "native context destroy reported failure"
                );
            }
            tracing::debug!(context_id = self.id.0, "native context destroyed");
        }
    }

    fn live(&self) -> Result<*mut RawContext, BridgeError> {
        self.raw
            .map(NonNull::as_ptr)
            .ok_or_else(|| BridgeError::invalid_argument("context has been destroyed"))
    }
}

impl Drop for NativeContext {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeContext")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

fn to_cstring(value: &str, what: &str) -> Result<CString, BridgeError> {
    CString::new(value)
        .map_err(|_| BridgeError::invalid_argument(format!("{} contains a NUL byte", what)))
}

/// Turn a raw status into a result, reading this thread's diagnostic on failure.
fn check(api: &NativeApi, code: i32) -> Result<(), BridgeError> {
    let status = NativeStatus::from_raw(code);
    if status == NativeStatus::Ok {
        return Ok(());
    }
    Err(BridgeError::new(status, last_error(api, status)))
}

fn last_error(api: &NativeApi, status: NativeStatus) -> String {
    // SAFETY: the engine returns null or a string it keeps alive; it has
    // already consumed the message, so it is copied and never freed here.
    let message = unsafe {
        let p = (api.last_error)();
        if p.is_null() {
            None
        } else {
            Some(CStr::from_ptr(p).to_string_lossy().into_owned())
        }
    };
    message.unwrap_or_else(|| status.to_string())
}
