//! The run gate: shared Start/Stop state between the control path and the
//! acquisition loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Binary running/stopped state plus the session-start timestamp.
///
/// Created once at startup and injected (`Arc`) into both the acquisition
/// thread and the control task. The control path sets and clears it without
/// ever blocking on sensor I/O; the acquisition loop observes it once per
/// tick without blocking on the control path.
pub struct RunGate {
    running: AtomicBool,
    session_start: Mutex<Instant>,
}

impl RunGate {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            session_start: Mutex::new(Instant::now()),
        }
    }

    /// Accept a Start command. Captures a fresh session-start timestamp and
    /// sets the gate; returns false (no transition, no acknowledgment) if a
    /// session is already running.
    pub fn start(&self) -> bool {
        let mut session_start = self.session_start.lock().unwrap();
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        *session_start = Instant::now();
        self.running.store(true, Ordering::Release);
        true
    }

    /// Clear the gate. Returns true if a session was actually running.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Milliseconds since the session began, truncated to the 16-bit wire
    /// field. Wraps at ~65.5 s; sessions are expected to stay shorter.
    pub fn elapsed_ms(&self) -> u16 {
        self.session_start.lock().unwrap().elapsed().as_millis() as u16
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}
