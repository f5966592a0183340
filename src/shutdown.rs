//! Graceful shutdown coordination.
//!
//! On shutdown the gateway stops admitting requests, waits for in-flight
//! requests (including open streams) to finish, then closes the engine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;

/// Shutdown state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

/// Result of a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownResult {
    Complete,
    Timeout { remaining: u32 },
}

struct Inner {
    state: RwLock<ShutdownState>,
    in_flight: AtomicU32,
    notify: Notify,
}

/// Tracks in-flight requests and drives the drain.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(ShutdownState::Running),
                in_flight: AtomicU32::new(0),
                notify: Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.inner.state.read()
    }

    pub fn is_accepting(&self) -> bool {
        self.state() == ShutdownState::Running
    }

    /// Admit one request. Returns None once shutdown has begun.
    pub fn track(&self) -> Option<RequestGuard> {
        // Hold the read lock so a concurrent drain cannot miss this request.
        let state = self.inner.state.read();
        if *state != ShutdownState::Running {
            return None;
        }
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(RequestGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn in_flight_count(&self) -> u32 {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Stop admitting, wait up to `timeout` for in-flight requests, then stop.
    pub async fn initiate(&self, timeout: Duration) -> ShutdownResult {
        *self.inner.state.write() = ShutdownState::Draining;
        tracing::info!(in_flight = self.in_flight_count(), "draining in-flight requests");

        let result = self.wait_for_drain(timeout).await;

        *self.inner.state.write() = ShutdownState::Stopped;
        result
    }

    async fn wait_for_drain(&self, timeout: Duration) -> ShutdownResult {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register interest before checking so a release in between is not lost.
            let notified = self.inner.notify.notified();
            let count = self.in_flight_count();
            if count == 0 {
                return ShutdownResult::Complete;
            }

            tokio::select! {
                _ = notified => continue,
                _ = tokio::time::sleep_until(deadline) => {
                    let remaining = self.in_flight_count();
                    if remaining == 0 {
                        return ShutdownResult::Complete;
                    }
                    return ShutdownResult::Timeout { remaining };
                }
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one admitted request.
pub struct RequestGuard {
    inner: Arc<Inner>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }
}
