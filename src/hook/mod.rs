/*!
 * Exit Hook Registrar
 *
 * Installs the accountant hook into process teardown so it runs last and
 * exactly once, whichever teardown path the host takes.
 */

mod install;
mod registry;
mod runner;
mod trigger;

pub use install::{install, install_runner, is_installed, register_teardown, registry, state};
pub use registry::{TeardownFn, TeardownRegistry};
pub use runner::{HookOutcome, HookRunner};
pub use trigger::{exit, run_teardown, TeardownGuard};
