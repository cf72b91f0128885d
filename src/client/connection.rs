/*!
 * Accountant Connections
 *
 * `Connector` is the seam between the handshake and the network: production
 * code opens a fresh loopback TCP stream per call, tests substitute their own.
 */

use crate::config::AccountantEndpoint;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// A connected byte stream to the accountant
pub trait Connection: Read + Write + Send {
    /// Bound (or unbind, with `None`) subsequent reads
    fn set_ack_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Connection for TcpStream {
    fn set_ack_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Opens connections to the accountant
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send + Sync {
    /// Open one new connection; `timeout` bounds the connect itself
    fn connect(
        &self,
        endpoint: &AccountantEndpoint,
        timeout: Option<Duration>,
    ) -> io::Result<Box<dyn Connection>>;
}

/// Plain TCP over loopback
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackConnector;

impl Connector for LoopbackConnector {
    fn connect(
        &self,
        endpoint: &AccountantEndpoint,
        timeout: Option<Duration>,
    ) -> io::Result<Box<dyn Connection>> {
        let addr = endpoint.socket_addr();
        let stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        Ok(Box::new(stream))
    }
}
