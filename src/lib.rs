/*!
 * Accountant Hook Library
 *
 * Reports the exiting process to a co-located accountant over loopback TCP
 * and holds the exit until the accountant releases it.
 *
 * ```no_run
 * use accountant_hook::HookConfig;
 *
 * fn main() {
 *     accountant_hook::install(HookConfig::from_env()).ok();
 *     // ... work ...
 *     accountant_hook::exit(0);
 * }
 * ```
 */

pub mod client;
pub mod config;
pub mod core;
pub mod gate;
pub mod hook;
pub mod monitoring;
pub mod trap;

// Re-exports
pub use client::{HandshakeOutcome, NotificationClient, NotificationMessage};
pub use config::{AccountantEndpoint, AckWait, GatePolicy, HookConfig, TriggerKind};
pub use crate::core::errors::{HookError, HookResult};
pub use crate::core::types::{ExitStatus, HookState, Pid, ProcessIdentity};
pub use gate::{should_notify, ResourceGate, ResourceSample};
pub use hook::{
    exit, install, install_runner, register_teardown, run_teardown, state, HookOutcome,
    HookRunner, TeardownGuard,
};
pub use monitoring::init_tracing;
pub use trap::{DebugTrap, NoTrap, SignalTrap};
