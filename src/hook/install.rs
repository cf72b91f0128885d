/*!
 * Hook Installation
 *
 * Process-wide registration of the accountant hook. Call [`install`] once at
 * process start; repeated calls are no-ops.
 */

use super::registry::TeardownRegistry;
use super::runner::HookRunner;
use super::trigger;
use crate::config::HookConfig;
use crate::core::errors::HookResult;
use crate::core::types::{ExitStatus, HookState, StateCell};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

static REGISTRY: OnceLock<TeardownRegistry> = OnceLock::new();
static INSTALLED: OnceLock<Arc<StateCell>> = OnceLock::new();

/// The process-wide teardown registry
pub fn registry() -> &'static TeardownRegistry {
    REGISTRY.get_or_init(TeardownRegistry::new)
}

/// Install the accountant hook with `config`
///
/// The hook is registered at the reserved last priority and an `atexit`
/// trampoline is registered so returning from `main` or calling
/// `std::process::exit` anywhere still reaches it.
pub fn install(config: HookConfig) -> HookResult<()> {
    install_runner(HookRunner::new(config))
}

/// Install a preconfigured runner
///
/// The `atexit` trampoline is registered before the hook is latched in, so a
/// failed registration leaves nothing installed and a later call retries it.
pub fn install_runner(runner: HookRunner) -> HookResult<()> {
    if INSTALLED.get().is_some() {
        debug!("accountant hook already installed");
        return Ok(());
    }

    trigger::register_atexit()?;

    let mut fresh = false;
    let state = INSTALLED.get_or_init(|| {
        fresh = true;
        runner.state()
    });
    if !fresh {
        debug!("accountant hook already installed");
        return Ok(());
    }

    debug!(runner = ?runner, "installing accountant hook");
    registry().register_last("accountant-hook", move |status| {
        runner.run(status);
    });
    state.advance(HookState::Registered);

    info!("accountant hook installed");
    Ok(())
}

/// Register a host teardown action that runs before the accountant hook
///
/// # Errors
/// `HookError::ReservedPriority` for `HOOK_PRIORITY`.
pub fn register_teardown<F>(name: impl Into<String>, priority: u16, action: F) -> HookResult<()>
where
    F: FnOnce(Option<ExitStatus>) + Send + 'static,
{
    registry().register(name, priority, action)
}

/// Current state of the installed hook
pub fn state() -> HookState {
    INSTALLED.get().map_or(HookState::Unregistered, |s| s.get())
}

/// Whether [`install`] has run in this process
pub fn is_installed() -> bool {
    INSTALLED.get().is_some() && trigger::atexit_registered()
}
