/*!
 * Protocol Limits and Constants
 *
 * Fixed values of the accountant handshake. The accountant listens on a
 * hardcoded loopback port and the gate threshold is part of the contract
 * accountants are tested against.
 */

use std::net::Ipv4Addr;
use std::time::Duration;

// =============================================================================
// ENDPOINT
// =============================================================================

/// Accountant address (loopback only)
pub const ACCOUNTANT_ADDR: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Accountant port
pub const ACCOUNTANT_PORT: u16 = 7117;

// =============================================================================
// HANDSHAKE
// =============================================================================

/// Bounded wait for the one-byte acknowledgment (500ms)
pub const ACK_TIMEOUT: Duration = Duration::from_millis(500);

/// Length of the acknowledgment read
pub const ACK_LEN: usize = 1;

/// Upper bound on a formatted notification line
/// `u32` pid + space + `i32` status + newline fits in 23 bytes
pub const MAX_MESSAGE_LEN: usize = 32;

// =============================================================================
// RESOURCE GATE
// =============================================================================

/// Whole seconds of user CPU time at or above which a process is reported
pub const GATE_MIN_SECONDS: i64 = 1;

/// Sub-second user CPU time (µs) at or above which a process is reported
pub const GATE_MIN_MICROS: i64 = 1_000_000 / 2;

// =============================================================================
// TEARDOWN ORDERING
// =============================================================================

/// Priority of the accountant hook; higher priorities run later
/// [RESERVED] host actions cannot register at this priority
pub const HOOK_PRIORITY: u16 = u16::MAX;
