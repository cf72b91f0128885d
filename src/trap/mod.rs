/*!
 * Debug Trap
 *
 * After the accountant released the process, optionally raise SIGTRAP on
 * ourselves so an attached inspector can pause the process before the OS
 * reclaims it. Without an attached tracer the default SIGTRAP disposition
 * terminates the process with a core dump.
 */

use crate::core::errors::{HookError, HookResult};
use tracing::{debug, warn};

/// Signal-self capability used after the handshake
pub trait DebugTrap: Send + Sync {
    fn raise_debug_trap(&self) -> HookResult<()>;

    /// Whether the platform can deliver the trap at all
    fn is_supported(&self) -> bool {
        true
    }
}

/// Raises SIGTRAP on the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTrap;

impl DebugTrap for SignalTrap {
    #[cfg(unix)]
    fn raise_debug_trap(&self) -> HookResult<()> {
        use nix::sys::signal::{raise, Signal};

        debug!("raising SIGTRAP for accountant inspection");
        raise(Signal::SIGTRAP).map_err(|e| HookError::Trap(e.desc().to_string()))
    }

    #[cfg(not(unix))]
    fn raise_debug_trap(&self) -> HookResult<()> {
        warn!("debug trap requested but not supported on this platform");
        Err(HookError::NotSupported("SIGTRAP".to_string()))
    }

    fn is_supported(&self) -> bool {
        cfg!(unix)
    }
}

/// Trap that does nothing, for deployments without the capability
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrap;

impl DebugTrap for NoTrap {
    fn raise_debug_trap(&self) -> HookResult<()> {
        Ok(())
    }

    fn is_supported(&self) -> bool {
        false
    }
}

/// Raise the trap and absorb any failure
pub fn raise_debug_trap(trap: &dyn DebugTrap) -> bool {
    match trap.raise_debug_trap() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "debug trap not delivered");
            false
        }
    }
}
