// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Streaming callback bridge.
//!
//! The engine can only hand back a fixed function pointer plus one
//! pointer-sized `user_data` word, and it may call from a thread the host
//! runtime does not manage. Closures are therefore parked in a process-wide
//! table keyed by a monotonically increasing token; only the token crosses the
//! boundary, and [`trampoline`] looks the closure up again on every unit.
//!
//! A [`Registration`] owns the table entry. Dropping it removes the entry, so
//! the token is gone once the streaming call returns regardless of how it
//! returned (completed, failed, stopped early or unwound).

use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::Mutex;

/// Host-side closure receiving each produced unit.
pub type UnitSink = Box<dyn FnMut(&str) -> bool + Send>;

/// Opaque token identifying one pending streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(usize);

impl CallbackToken {
    /// Recover the token the engine handed back as `user_data`.
    pub fn from_user_data(user_data: *mut c_void) -> Self {
        Self(user_data as usize)
    }

    pub fn as_user_data(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

struct Slot {
    sink: Mutex<UnitSink>,
    faulted: AtomicBool,
}

// Starts at 1 so a token never looks like a null `user_data`.
static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

fn table() -> &'static DashMap<usize, Arc<Slot>> {
    static TABLE: OnceLock<DashMap<usize, Arc<Slot>>> = OnceLock::new();
    TABLE.get_or_init(DashMap::new)
}

/// Park `sink` in the table for the duration of one streaming call.
pub fn register<F>(sink: F) -> Registration
where
    F: FnMut(&str) -> bool + Send + 'static,
{
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    let slot = Arc::new(Slot {
        sink: Mutex::new(Box::new(sink)),
        faulted: AtomicBool::new(false),
    });
    table().insert(token, Arc::clone(&slot));
    Registration { token, slot }
}

/// Whether `token` still has a live table entry.
pub fn is_registered(token: CallbackToken) -> bool {
    table().contains_key(&token.0)
}

/// Table entry for one streaming call. Removes itself on drop.
pub struct Registration {
    token: usize,
    slot: Arc<Slot>,
}

impl Registration {
    pub fn token(&self) -> CallbackToken {
        CallbackToken(self.token)
    }

    pub fn user_data(&self) -> *mut c_void {
        self.token().as_user_data()
    }

    /// True if the closure panicked while handling a unit.
    pub fn faulted(&self) -> bool {
        self.slot.faulted.load(Ordering::Acquire)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        table().remove(&self.token);
    }
}

/// Fixed entry point handed to the engine for every streaming call.
///
/// An unknown token stops generation. A panic in the closure is contained
/// here, marks the registration as faulted and stops generation.
pub extern "C" fn trampoline(unit: *const c_char, user_data: *mut c_void) -> bool {
    let token = CallbackToken::from_user_data(user_data).0;

    // Clone the slot out so the shard lock is not held while the closure runs.
    let slot = match table().get(&token) {
        Some(entry) => Arc::clone(entry.value()),
        None => return false,
    };

    if unit.is_null() {
        return true;
    }
    // SAFETY: the engine guarantees `unit` is a NUL-terminated string that
    // stays valid for the duration of this call.
    let text = unsafe { CStr::from_ptr(unit) }.to_string_lossy();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut sink = slot.sink.lock();
        (sink)(&text)
    }));

    match outcome {
        Ok(keep_going) => keep_going,
        Err(_) => {
            slot.faulted.store(true, Ordering::Release);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_tokens_are_unique_and_non_null() {
        let a = register(|_| true);
        let b = register(|_| true);
        assert_ne!(a.token(), b.token());
        assert!(!a.user_data().is_null());
        assert!(!b.user_data().is_null());
    }

    #[test]
    fn test_drop_removes_entry() {
        let registration = register(|_| true);
        let token = registration.token();
        assert!(is_registered(token));

        drop(registration);
        assert!(!is_registered(token));
    }

    #[test]
    fn test_trampoline_forwards_units_and_answer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let registration = register(move |unit: &str| {
            sink_seen.lock().push(unit.to_string());
            unit != "stop"
        });

        let hello = CString::new("hello").unwrap();
        let stop = CString::new("stop").unwrap();
        assert!(trampoline(hello.as_ptr(), registration.user_data()));
        assert!(!trampoline(stop.as_ptr(), registration.user_data()));

        assert_eq!(*seen.lock(), vec!["hello".to_string(), "stop".to_string()]);
    }

    #[test]
    fn test_trampoline_unknown_token_stops() {
        let registration = register(|_| true);
        let user_data = registration.user_data();
        drop(registration);

        let unit = CString::new("late").unwrap();
        assert!(!trampoline(unit.as_ptr(), user_data));
    }

    #[test]
    fn test_trampoline_null_unit_is_skipped() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let registration = register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        assert!(trampoline(std::ptr::null(), registration.user_data()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let registration = register(|_| panic!("sink exploded"));
        let unit = CString::new("x").unwrap();

        assert!(!trampoline(unit.as_ptr(), registration.user_data()));
        assert!(registration.faulted());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink_seen = Arc::clone(&seen);
        let registration = register(move |unit: &str| {
            sink_seen.lock().push_str(unit);
            true
        });

        let bytes = CString::new(vec![b'o', b'k', 0xff]).unwrap();
        assert!(trampoline(bytes.as_ptr(), registration.user_data()));
        assert_eq!(*seen.lock(), "ok\u{fffd}");
    }
}
