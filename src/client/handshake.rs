/*!
 * Accountant Handshake
 *
 * Runs inline on the exiting thread:
 * 1. Connect (one fresh connection, no retries)
 * 2. Bound the ack read when the variant is bounded
 * 3. Write the line once
 * 4. Block for one byte, EOF or timeout
 *
 * Every failure is absorbed into a [`HandshakeOutcome`]; nothing propagates
 * into the host process.
 */

use super::connection::{Connection, Connector, LoopbackConnector};
use super::message::NotificationMessage;
use crate::config::{AccountantEndpoint, AckWait, HookConfig};
use crate::core::errors::HookError;
use crate::core::limits::ACK_LEN;
use crate::core::types::{ExitStatus, HookState, ProcessIdentity, StateCell};
use crate::monitoring::HandshakeSpan;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::debug;

/// Why the handshake returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeOutcome {
    /// One byte arrived
    Acknowledged,
    /// Accountant closed the connection
    StreamClosed,
    /// Bounded ack wait expired
    TimedOut,
    /// No accountant listening; nothing was sent
    Unreachable,
    /// The ack read failed for another reason
    Failed,
}

impl HandshakeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acknowledged => "acknowledged",
            Self::StreamClosed => "stream_closed",
            Self::TimedOut => "timed_out",
            Self::Unreachable => "unreachable",
            Self::Failed => "failed",
        }
    }

    /// Whether a connection was established
    #[inline]
    pub fn connected(&self) -> bool {
        !matches!(self, Self::Unreachable)
    }
}

/// Client for the fixed-endpoint accountant protocol
pub struct NotificationClient {
    endpoint: AccountantEndpoint,
    ack_wait: AckWait,
    connector: Box<dyn Connector>,
}

impl NotificationClient {
    pub fn new(endpoint: AccountantEndpoint, ack_wait: AckWait) -> Self {
        Self::with_connector(endpoint, ack_wait, Box::new(LoopbackConnector))
    }

    pub fn with_connector(
        endpoint: AccountantEndpoint,
        ack_wait: AckWait,
        connector: Box<dyn Connector>,
    ) -> Self {
        Self {
            endpoint,
            ack_wait,
            connector,
        }
    }

    pub fn from_config(config: &HookConfig) -> Self {
        Self::new(config.endpoint, config.ack_wait)
    }

    #[inline]
    pub fn endpoint(&self) -> AccountantEndpoint {
        self.endpoint
    }

    /// Notify the accountant and wait for its release
    pub fn notify(&self, identity: ProcessIdentity, status: Option<ExitStatus>) -> HandshakeOutcome {
        self.notify_tracked(identity, status, &StateCell::new())
    }

    /// Same as [`notify`](Self::notify), reporting progress into `state`
    pub fn notify_tracked(
        &self,
        identity: ProcessIdentity,
        status: Option<ExitStatus>,
        state: &StateCell,
    ) -> HandshakeOutcome {
        let message = NotificationMessage::new(identity, status);
        let endpoint = self.endpoint.to_string();
        let span = HandshakeSpan::new(identity.pid, &endpoint, self.ack_wait.duration());
        let _entered = span.enter();

        state.advance(HookState::Connecting);
        let mut conn = match self.connector.connect(&self.endpoint, self.ack_wait.duration()) {
            Ok(conn) => conn,
            Err(source) => {
                let error = HookError::Connect { endpoint, source };
                debug!(error = %error, "accountant unreachable, skipping notification");
                span.record_outcome(HandshakeOutcome::Unreachable.as_str());
                return HandshakeOutcome::Unreachable;
            }
        };
        state.advance(HookState::Connected);

        if let Some(timeout) = self.ack_wait.duration() {
            if let Err(e) = conn.set_ack_timeout(Some(timeout)) {
                debug!(error = %HookError::SocketOption(e), "ack wait left unbounded");
            }
        }

        // A failed write still waits for the ack; the accountant decides
        if let Err(e) = conn.write_all(&message.to_bytes()) {
            debug!(error = %HookError::Send(e), "notification write failed");
        }
        state.advance(HookState::Sent);

        state.advance(HookState::AckAwaited);
        let outcome = await_ack(conn.as_mut());
        state.advance(HookState::AckReceivedOrTimedOut);

        span.record_outcome(outcome.as_str());
        debug!(message = %message.to_string().trim_end(), outcome = outcome.as_str(), "accountant released process");
        outcome
    }
}

impl std::fmt::Debug for NotificationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationClient")
            .field("endpoint", &self.endpoint)
            .field("ack_wait", &self.ack_wait)
            .finish_non_exhaustive()
    }
}

/// Block for the single ack byte; its content is ignored
fn await_ack(conn: &mut dyn Connection) -> HandshakeOutcome {
    let mut buf = [0u8; ACK_LEN];
    loop {
        match conn.read(&mut buf) {
            Ok(0) => return HandshakeOutcome::StreamClosed,
            Ok(_) => return HandshakeOutcome::Acknowledged,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return HandshakeOutcome::TimedOut
            }
            Err(e) => {
                debug!(error = %HookError::Ack(e), "ack read failed");
                return HandshakeOutcome::Failed;
            }
        }
    }
}
