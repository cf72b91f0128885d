/*!
 * Teardown Registry
 *
 * Ordered list of actions drained once when the process tears down.
 *
 * Ordering: lower priorities run first; equal priorities run in reverse
 * registration order, like atexit handlers. `HOOK_PRIORITY` is reserved for
 * the accountant hook so it always runs last.
 *
 * Draining: the first caller owns the drain. Actions stay in the registry
 * until they are popped, so an action that exits the process re-enters
 * [`TeardownRegistry::run`] on the same thread and the nested call finishes
 * what is left. Callers on other threads block until the drain is complete.
 */

use crate::core::errors::{HookError, HookResult};
use crate::core::limits::HOOK_PRIORITY;
use crate::core::types::ExitStatus;
use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, error};

/// Teardown action; receives the exit status when the trigger carries one
pub type TeardownFn = Box<dyn FnOnce(Option<ExitStatus>) + Send + 'static>;

struct TeardownAction {
    name: String,
    priority: u16,
    seq: u64,
    run: TeardownFn,
}

/// Drain ownership; `owner` is the pthread id of the draining thread
#[derive(Default)]
struct DrainState {
    owner: Option<usize>,
    done: bool,
    status: Option<ExitStatus>,
}

/// Process-wide teardown actions with at-most-once execution
pub struct TeardownRegistry {
    actions: Mutex<Vec<TeardownAction>>,
    next_seq: AtomicU64,
    fired: AtomicBool,
    drain: Mutex<DrainState>,
    drained: Condvar,
}

/// Identity of the calling thread that stays valid inside atexit handlers,
/// after std's thread-locals may already be gone
fn current_thread() -> usize {
    // SAFETY: pthread_self has no preconditions and cannot fail.
    unsafe { libc::pthread_self() as usize }
}

impl TeardownRegistry {
    pub fn new() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(0),
            fired: AtomicBool::new(false),
            drain: Mutex::new(DrainState::default()),
            drained: Condvar::new(),
        }
    }

    /// Register a host teardown action
    ///
    /// # Errors
    /// `HookError::ReservedPriority` when `priority` is `HOOK_PRIORITY`.
    pub fn register<F>(&self, name: impl Into<String>, priority: u16, action: F) -> HookResult<()>
    where
        F: FnOnce(Option<ExitStatus>) + Send + 'static,
    {
        if priority >= HOOK_PRIORITY {
            return Err(HookError::ReservedPriority(priority));
        }
        self.push(name.into(), priority, Box::new(action));
        Ok(())
    }

    /// Register at the reserved last-running priority
    pub(crate) fn register_last<F>(&self, name: impl Into<String>, action: F)
    where
        F: FnOnce(Option<ExitStatus>) + Send + 'static,
    {
        self.push(name.into(), HOOK_PRIORITY, Box::new(action));
    }

    fn push(&self, name: String, priority: u16, run: TeardownFn) {
        if self.drain.lock().done {
            debug!(action = %name, "teardown already ran, action will never execute");
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        debug!(action = %name, priority, "teardown action registered");
        self.actions.lock().push(TeardownAction {
            name,
            priority,
            seq,
            run,
        });
    }

    /// Number of pending actions
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`run`](Self::run) already executed
    #[inline]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Drain and execute every action, once per registry
    ///
    /// Returns the number of actions this call executed.
    ///
    /// - First caller: runs actions one at a time until none are pending.
    /// - Same thread again (an action called `exit`): keeps draining the
    ///   remaining actions; `status`, when present, replaces the original one.
    /// - Other threads: block until the drain completes, then return 0.
    /// - Any call after completion returns 0 immediately.
    pub fn run(&self, status: Option<ExitStatus>) -> usize {
        let me = current_thread();
        {
            let mut drain = self.drain.lock();
            if drain.done {
                debug!("teardown already ran, skipping");
                return 0;
            }
            match drain.owner {
                None => {
                    drain.owner = Some(me);
                    drain.status = status;
                    self.fired.store(true, Ordering::Release);
                }
                Some(owner) if owner == me => {
                    debug!("teardown re-entered from a teardown action, continuing drain");
                    if status.is_some() {
                        drain.status = status;
                    }
                }
                Some(_) => {
                    debug!("teardown in progress on another thread, waiting");
                    while !drain.done {
                        self.drained.wait(&mut drain);
                    }
                    return 0;
                }
            }
        }

        let mut count = 0;
        while let Some(action) = self.next_action() {
            let TeardownAction { name, run, .. } = action;
            let status = self.drain.lock().status;
            if panic::catch_unwind(AssertUnwindSafe(move || run(status))).is_err() {
                error!(action = %name, "teardown action panicked");
            }
            count += 1;
        }

        self.drain.lock().done = true;
        self.drained.notify_all();
        count
    }

    /// Pop the next action to run: lowest priority, latest registration
    fn next_action(&self) -> Option<TeardownAction> {
        let mut actions = self.actions.lock();
        let index = actions
            .iter()
            .enumerate()
            .min_by_key(|(_, a)| (a.priority, Reverse(a.seq)))
            .map(|(i, _)| i)?;
        Some(actions.swap_remove(index))
    }
}

impl Default for TeardownRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TeardownRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownRegistry")
            .field("pending", &self.len())
            .field("fired", &self.has_fired())
            .finish()
    }
}
