/*!
 * Core Types
 * Identity, status and state types shared by the hook components
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Process ID type
pub type Pid = u32;

/// Exit code handed to the status-aware trigger
pub type ExitStatus = i32;

/// Identity of the host process, read once when the hook executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub pid: Pid,
}

impl ProcessIdentity {
    #[inline]
    pub const fn new(pid: Pid) -> Self {
        Self { pid }
    }

    /// Identity of the calling process
    #[inline]
    pub fn current() -> Self {
        Self::new(std::process::id())
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pid)
    }
}

/// Per-process hook state machine
///
/// ```text
/// Unregistered → Registered → GateChecked → Skipped
///                                         → Connecting → Connected → Sent
///                                           → AckAwaited → AckReceivedOrTimedOut
///                                           → [TrapRaised] → Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HookState {
    Unregistered = 0,
    Registered = 1,
    GateChecked = 2,
    Skipped = 3,
    Connecting = 4,
    Connected = 5,
    Sent = 6,
    AckAwaited = 7,
    AckReceivedOrTimedOut = 8,
    TrapRaised = 9,
    Terminated = 10,
}

impl HookState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Registered,
            2 => Self::GateChecked,
            3 => Self::Skipped,
            4 => Self::Connecting,
            5 => Self::Connected,
            6 => Self::Sent,
            7 => Self::AckAwaited,
            8 => Self::AckReceivedOrTimedOut,
            9 => Self::TrapRaised,
            10 => Self::Terminated,
            _ => Self::Unregistered,
        }
    }

    /// Check if no further transition can happen
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lock-free cell holding the current [`HookState`]
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(HookState::Unregistered as u8))
    }

    #[inline]
    pub fn get(&self) -> HookState {
        HookState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next`; states never move backwards
    pub fn advance(&self, next: HookState) {
        let previous = self.0.fetch_max(next as u8, Ordering::AcqRel);
        tracing::trace!(
            from = %HookState::from_u8(previous),
            to = %next,
            "hook state transition"
        );
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
