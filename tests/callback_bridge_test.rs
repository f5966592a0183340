//! Streaming callback bridge tests.
//!
//! Each test drives a real `NativeContext` through a function table built from
//! the reference engine with the streaming entry swapped out, so the token
//! handed across the boundary can be observed.

use std::cell::Cell;
use std::ffi::{c_char, c_void};
use std::io::Write;
use std::sync::{Arc, Mutex};

use ir_gateway::ffi::callback::{self, trampoline};
use ir_gateway::ffi::stub::STUB_API;
use ir_gateway::ffi::{
    Backend, CallbackToken, NativeApi, NativeContext, NativeStatus, RawContext, RawParams,
    UnitCallback,
};
use tempfile::NamedTempFile;

thread_local! {
    // Streaming calls run synchronously on the caller's thread.
    static LAST_TOKEN: Cell<usize> = const { Cell::new(0) };
    static REGISTERED_DURING_CALL: Cell<bool> = const { Cell::new(false) };
}

fn last_token() -> CallbackToken {
    CallbackToken::from_user_data(LAST_TOKEN.with(Cell::get) as *mut c_void)
}

unsafe extern "C" fn recording_streaming(
    ctx: *mut RawContext,
    prompt: *const c_char,
    params: RawParams,
    on_unit: UnitCallback,
    user_data: *mut c_void,
) -> i32 {
    LAST_TOKEN.with(|t| t.set(user_data as usize));
    let live = callback::is_registered(CallbackToken::from_user_data(user_data));
    REGISTERED_DURING_CALL.with(|r| r.set(live));
    (STUB_API.generate_streaming)(ctx, prompt, params, on_unit, user_data)
}

unsafe extern "C" fn failing_streaming(
    _ctx: *mut RawContext,
    _prompt: *const c_char,
    _params: RawParams,
    on_unit: UnitCallback,
    user_data: *mut c_void,
) -> i32 {
    LAST_TOKEN.with(|t| t.set(user_data as usize));
    let unit = b"partial \0";
    on_unit(unit.as_ptr() as *const c_char, user_data);
    NativeStatus::Generate.as_raw()
}

unsafe extern "C" fn fixed_last_error() -> *const c_char {
    b"decode step failed\0".as_ptr() as *const c_char
}

unsafe extern "C" fn off_thread_streaming(
    _ctx: *mut RawContext,
    _prompt: *const c_char,
    _params: RawParams,
    on_unit: UnitCallback,
    user_data: *mut c_void,
) -> i32 {
    LAST_TOKEN.with(|t| t.set(user_data as usize));
    let token = user_data as usize;
    let worker = std::thread::spawn(move || {
        let user_data = token as *mut c_void;
        for unit in [&b"from \0"[..], &b"elsewhere \0"[..]] {
            if !on_unit(unit.as_ptr() as *const c_char, user_data) {
                break;
            }
        }
    });
    let _ = worker.join();
    NativeStatus::Ok.as_raw()
}

fn recording_api() -> NativeApi {
    NativeApi {
        generate_streaming: recording_streaming,
        ..STUB_API
    }
}

fn params() -> RawParams {
    RawParams {
        max_tokens: 256,
        temperature: 0.8,
        top_k: 40,
        top_p: 0.95,
        repetition_penalty: 1.0,
        seed: 0,
    }
}

fn loaded_context(api: NativeApi) -> (NativeContext, NamedTempFile) {
    let mut model = NamedTempFile::new().unwrap();
    model.write_all(&[0u8; 4096]).unwrap();
    let mut ctx = NativeContext::create(api, Backend::Cpu).unwrap();
    ctx.load(model.path()).unwrap();
    (ctx, model)
}

fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) -> bool + Send + 'static) {
    let units = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&units);
    (units, move |unit: &str| {
        sink.lock().unwrap().push(unit.to_string());
        true
    })
}

#[test]
fn test_token_released_after_completion() {
    let (mut ctx, _model) = loaded_context(recording_api());
    let (units, sink) = collector();

    ctx.generate_streaming("one two three", &params(), sink).unwrap();

    assert_eq!(*units.lock().unwrap(), vec!["one ", "two ", "three "]);
    assert!(REGISTERED_DURING_CALL.with(Cell::get));
    assert!(!callback::is_registered(last_token()));
}

#[test]
fn test_token_released_after_engine_error() {
    let api = NativeApi {
        generate_streaming: failing_streaming,
        last_error: fixed_last_error,
        ..STUB_API
    };
    let (mut ctx, _model) = loaded_context(api);
    let (units, sink) = collector();

    let err = ctx.generate_streaming("anything", &params(), sink).unwrap_err();

    assert_eq!(err.status, NativeStatus::Generate);
    assert_eq!(err.message, "decode step failed");
    assert_eq!(*units.lock().unwrap(), vec!["partial "]);
    assert!(!callback::is_registered(last_token()));
}

#[test]
fn test_token_released_after_early_stop() {
    let (mut ctx, _model) = loaded_context(recording_api());
    let units = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&units);

    ctx.generate_streaming("a b c d e", &params(), move |unit| {
        let mut seen = sink.lock().unwrap();
        seen.push(unit.to_string());
        seen.len() < 2
    })
    .unwrap();

    assert_eq!(*units.lock().unwrap(), vec!["a ", "b "]);
    assert!(!callback::is_registered(last_token()));
}

#[test]
fn test_panicking_closure_is_contained() {
    let (mut ctx, _model) = loaded_context(recording_api());
    let calls = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&calls);

    let err = ctx
        .generate_streaming("a b c", &params(), move |_unit| {
            *counter.lock().unwrap() += 1;
            panic!("sink exploded");
        })
        .unwrap_err();

    assert_eq!(err.status, NativeStatus::Internal);
    assert_eq!(err.message, "streaming callback panicked");
    // Generation stops at the first panic.
    assert_eq!(*calls.lock().unwrap(), 1);
    assert!(!callback::is_registered(last_token()));

    // The context stays usable.
    let (units, sink) = collector();
    ctx.generate_streaming("still works", &params(), sink).unwrap();
    assert_eq!(units.lock().unwrap().len(), 2);
}

#[test]
fn test_units_delivered_from_engine_thread() {
    let api = NativeApi {
        generate_streaming: off_thread_streaming,
        ..STUB_API
    };
    let (mut ctx, _model) = loaded_context(api);
    let (units, sink) = collector();

    ctx.generate_streaming("ignored", &params(), sink).unwrap();

    assert_eq!(*units.lock().unwrap(), vec!["from ", "elsewhere "]);
    assert!(!callback::is_registered(last_token()));
}

#[test]
fn test_tokens_are_unique_and_nonzero() {
    let (mut ctx, _model) = loaded_context(recording_api());
    let mut seen = Vec::new();
    for _ in 0..3 {
        ctx.generate_streaming("x", &params(), |_| true).unwrap();
        seen.push(LAST_TOKEN.with(Cell::get));
    }
    assert!(seen.iter().all(|t| *t != 0));
    seen.dedup();
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_trampoline_rejects_unknown_token() {
    let stale = {
        let registration = callback::register(|_| true);
        registration.token()
    };
    assert!(!callback::is_registered(stale));

    let unit = b"late \0";
    assert!(!trampoline(unit.as_ptr() as *const c_char, stale.as_user_data()));
}

#[test]
fn test_trampoline_skips_null_unit() {
    let (units, sink) = collector();
    let registration = callback::register(sink);

    assert!(trampoline(std::ptr::null(), registration.user_data()));
    assert!(units.lock().unwrap().is_empty());
}
