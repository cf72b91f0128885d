/*!
 * Hook Configuration
 *
 * Selects one of the three accountant protocol variants:
 * - Status-aware: exit code on the wire, 500ms bounded ack wait (canonical)
 * - Generic: pid only, unbounded ack wait, debug trap after ack
 * - Ungated: generic without the CPU gate
 *
 * The variants are mutually exclusive; pick one preset and adjust it with the
 * builder methods rather than mixing behaviors.
 */

use crate::core::limits::{ACCOUNTANT_ADDR, ACCOUNTANT_PORT, ACK_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Environment variable selecting the protocol variant
pub const VARIANT_ENV: &str = "ACCOUNTANT_HOOK_VARIANT";

/// Where the accountant listens
///
/// Always loopback. Production code uses [`AccountantEndpoint::default`];
/// [`AccountantEndpoint::loopback`] exists for harnesses that run a listener
/// on an ephemeral port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountantEndpoint {
    port: u16,
}

impl AccountantEndpoint {
    pub const fn loopback(port: u16) -> Self {
        Self { port }
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(ACCOUNTANT_ADDR, self.port))
    }
}

impl Default for AccountantEndpoint {
    fn default() -> Self {
        Self::loopback(ACCOUNTANT_PORT)
    }
}

impl fmt::Display for AccountantEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Wait policy for the acknowledgment read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckWait {
    /// Block until a byte arrives or the accountant closes the connection.
    /// A silent accountant hangs the exiting process.
    Unbounded,

    /// Give up after the duration and let teardown continue
    Bounded(Duration),
}

impl AckWait {
    /// Get the duration for this policy
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(d) => Some(*d),
        }
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded(_))
    }
}

impl Default for AckWait {
    fn default() -> Self {
        Self::Bounded(ACK_TIMEOUT)
    }
}

/// Which teardown trigger drives the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Exit code is put on the wire when the trigger carries one
    StatusAware,
    /// Only the pid is sent
    Generic,
}

/// Whether the CPU gate runs before notifying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatePolicy {
    /// Skip processes with trivial user CPU time
    CpuThreshold,
    /// Always notify
    Disabled,
}

/// Complete hook configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    pub endpoint: AccountantEndpoint,
    pub trigger: TriggerKind,
    pub gate: GatePolicy,
    pub ack_wait: AckWait,
    /// Raise SIGTRAP after the handshake
    pub debug_trap: bool,
}

impl HookConfig {
    /// Status-aware variant with a bounded ack wait
    pub fn status_aware() -> Self {
        Self {
            endpoint: AccountantEndpoint::default(),
            trigger: TriggerKind::StatusAware,
            gate: GatePolicy::CpuThreshold,
            ack_wait: AckWait::Bounded(ACK_TIMEOUT),
            debug_trap: false,
        }
    }

    /// Generic-teardown variant: unbounded wait, trap after ack
    pub fn generic_with_trap() -> Self {
        Self {
            endpoint: AccountantEndpoint::default(),
            trigger: TriggerKind::Generic,
            gate: GatePolicy::CpuThreshold,
            ack_wait: AckWait::Unbounded,
            debug_trap: true,
        }
    }

    /// Generic-teardown variant without the CPU gate
    pub fn ungated_with_trap() -> Self {
        Self {
            gate: GatePolicy::Disabled,
            ..Self::generic_with_trap()
        }
    }

    /// Pick a preset from `ACCOUNTANT_HOOK_VARIANT`
    ///
    /// Accepts `status`, `generic` and `ungated`. Unset or unknown values fall
    /// back to [`HookConfig::status_aware`].
    pub fn from_env() -> Self {
        match std::env::var(VARIANT_ENV) {
            Ok(value) => Self::from_variant_name(&value).unwrap_or_else(|| {
                tracing::warn!(variant = %value, "unknown accountant hook variant, using status-aware");
                Self::status_aware()
            }),
            Err(_) => Self::status_aware(),
        }
    }

    /// Look up a preset by name
    pub fn from_variant_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "status" | "status-aware" => Some(Self::status_aware()),
            "generic" => Some(Self::generic_with_trap()),
            "ungated" => Some(Self::ungated_with_trap()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: AccountantEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ack_wait(mut self, ack_wait: AckWait) -> Self {
        self.ack_wait = ack_wait;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_gate(mut self, gate: GatePolicy) -> Self {
        self.gate = gate;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_trap(mut self, enabled: bool) -> Self {
        self.debug_trap = enabled;
        self
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self::status_aware()
    }
}
