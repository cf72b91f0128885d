/*!
 * Notification Message
 * `"<pid>\n"` or `"<pid> <status>\n"` in base-10 ASCII
 */

use crate::core::limits::MAX_MESSAGE_LEN;
use crate::core::types::{ExitStatus, ProcessIdentity};
use std::fmt;

/// Line sent to the accountant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationMessage {
    pub identity: ProcessIdentity,
    pub status: Option<ExitStatus>,
}

impl NotificationMessage {
    pub fn new(identity: ProcessIdentity, status: Option<ExitStatus>) -> Self {
        Self { identity, status }
    }

    /// Encoded line including the trailing newline
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_MESSAGE_LEN);
        buf.extend_from_slice(self.to_string().as_bytes());
        buf
    }

    /// Parse a line as the accountant reads it
    ///
    /// The trailing newline is optional; anything beyond two whitespace
    /// separated integers is rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let pid = fields.next()?.parse().ok()?;
        let status = match fields.next() {
            Some(field) => Some(field.parse().ok()?),
            None => None,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(ProcessIdentity::new(pid), status))
    }
}

impl fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => writeln!(f, "{} {}", self.identity, status),
            None => writeln!(f, "{}", self.identity),
        }
    }
}
