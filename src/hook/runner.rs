/*!
 * Hook Runner
 *
 * The combined teardown action: gate, handshake, optional trap. Runs inline
 * on the exiting thread and never returns an error.
 */

use crate::client::{HandshakeOutcome, NotificationClient};
use crate::config::{HookConfig, TriggerKind};
use crate::core::types::{ExitStatus, HookState, ProcessIdentity, StateCell};
use crate::gate::ResourceGate;
use crate::trap::{self, DebugTrap, NoTrap, SignalTrap};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one hook execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "handshake", rename_all = "snake_case")]
pub enum HookOutcome {
    /// CPU usage too small to report
    Skipped,
    /// The hook already ran in this process
    AlreadyFired,
    /// Handshake attempted
    Notified(HandshakeOutcome),
}

/// Gate + notify + trap, bound to one configuration
pub struct HookRunner {
    trigger: TriggerKind,
    debug_trap: bool,
    gate: ResourceGate,
    client: NotificationClient,
    trap: Box<dyn DebugTrap>,
    state: Arc<StateCell>,
    fired: AtomicBool,
}

impl HookRunner {
    pub fn new(config: HookConfig) -> Self {
        let trap: Box<dyn DebugTrap> = if config.debug_trap {
            Box::new(SignalTrap)
        } else {
            Box::new(NoTrap)
        };

        Self {
            trigger: config.trigger,
            debug_trap: config.debug_trap,
            gate: ResourceGate::new(config.gate),
            client: NotificationClient::from_config(&config),
            trap,
            state: Arc::new(StateCell::new()),
            fired: AtomicBool::new(false),
        }
    }

    /// Replace the resource gate
    #[inline]
    #[must_use]
    pub fn with_gate(mut self, gate: ResourceGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the notification client
    #[inline]
    #[must_use]
    pub fn with_client(mut self, client: NotificationClient) -> Self {
        self.client = client;
        self
    }

    /// Replace the trap implementation; it is only used when the config enabled the trap
    #[inline]
    #[must_use]
    pub fn with_trap(mut self, trap: Box<dyn DebugTrap>) -> Self {
        self.trap = trap;
        self
    }

    /// Shared handle to this runner's state machine
    pub fn state(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Execute the hook for the current process
    pub fn run(&self, status: Option<ExitStatus>) -> HookOutcome {
        self.run_as(ProcessIdentity::current(), status)
    }

    /// Execute the hook for `identity`; at most once per runner
    pub fn run_as(&self, identity: ProcessIdentity, status: Option<ExitStatus>) -> HookOutcome {
        if self.fired.swap(true, Ordering::AcqRel) {
            debug!(pid = identity.pid, "accountant hook already fired");
            return HookOutcome::AlreadyFired;
        }

        let notify = self.gate.check();
        self.state.advance(HookState::GateChecked);
        if !notify {
            self.state.advance(HookState::Skipped);
            self.state.advance(HookState::Terminated);
            debug!(pid = identity.pid, "trivial CPU usage, accountant not notified");
            return HookOutcome::Skipped;
        }

        let status = match self.trigger {
            TriggerKind::StatusAware => status,
            TriggerKind::Generic => None,
        };

        let handshake = self.client.notify_tracked(identity, status, &self.state);

        if self.debug_trap && handshake.connected() && trap::raise_debug_trap(self.trap.as_ref()) {
            self.state.advance(HookState::TrapRaised);
        }

        self.state.advance(HookState::Terminated);
        info!(
            pid = identity.pid,
            status = ?status,
            outcome = handshake.as_str(),
            "accountant hook finished"
        );
        HookOutcome::Notified(handshake)
    }
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner")
            .field("trigger", &self.trigger)
            .field("debug_trap", &self.debug_trap)
            .field("gate", &self.gate)
            .field("client", &self.client)
            .field("state", &self.state.get())
            .finish()
    }
}
