/*!
 * Teardown Triggers
 *
 * Three ways the process reaches the teardown registry:
 * - `exit(code)`: status-aware, then `std::process::exit`
 * - `atexit` trampoline: return from `main` or `std::process::exit` elsewhere
 * - `TeardownGuard`: drop on the unwind path of `main`
 *
 * Whichever fires first runs the registry. Triggers on other threads wait
 * for it to finish; a trigger fired from inside a teardown action continues
 * the drain.
 */

use super::install::registry;
use crate::core::errors::{HookError, HookResult};
use crate::core::types::ExitStatus;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

static ATEXIT: AtexitRegistration = AtexitRegistration::new();

/// Tracks whether the trampoline reached libc; a failed attempt can be retried
pub(crate) struct AtexitRegistration {
    registered: AtomicBool,
}

impl AtexitRegistration {
    pub(crate) const fn new() -> Self {
        Self {
            registered: AtomicBool::new(false),
        }
    }

    /// Run `register` unless an earlier call succeeded
    pub(crate) fn register_with(&self, register: impl FnOnce() -> libc::c_int) -> HookResult<()> {
        if self.registered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let rc = register();
        if rc != 0 {
            self.registered.store(false, Ordering::SeqCst);
            return Err(HookError::Registration(format!("atexit returned {}", rc)));
        }
        Ok(())
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

/// Run every registered teardown action (at most once per process)
pub fn run_teardown(status: Option<ExitStatus>) -> usize {
    registry().run(status)
}

/// Run teardown with `code`, then terminate the process with `code`
pub fn exit(code: ExitStatus) -> ! {
    run_teardown(Some(code));
    std::process::exit(code)
}

extern "C" fn on_process_exit() {
    // Unwinding out of an extern "C" fn aborts the process
    if panic::catch_unwind(AssertUnwindSafe(|| run_teardown(None))).is_err() {
        error!("teardown panicked inside atexit");
    }
}

/// Register the atexit trampoline (idempotent, retried after a failure)
pub(crate) fn register_atexit() -> HookResult<()> {
    // SAFETY: `on_process_exit` is a plain extern "C" fn that never unwinds.
    ATEXIT.register_with(|| unsafe { libc::atexit(on_process_exit) })
}

pub(crate) fn atexit_registered() -> bool {
    ATEXIT.is_registered()
}

/// Runs teardown when dropped
///
/// Keep one alive for the whole of `main` so teardown also happens while a
/// panic unwinds out of it:
///
/// ```no_run
/// let mut guard = accountant_hook::TeardownGuard::new();
/// // ... work ...
/// guard.set_status(0);
/// ```
#[derive(Debug, Default)]
pub struct TeardownGuard {
    status: Option<ExitStatus>,
}

impl TeardownGuard {
    pub fn new() -> Self {
        Self { status: None }
    }

    /// Record the status the process is about to exit with
    pub fn set_status(&mut self, code: ExitStatus) {
        self.status = Some(code);
    }

    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        run_teardown(self.status);
    }
}
