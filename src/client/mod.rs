/*!
 * Notification Client
 * One-shot accountant handshake: connect, send one line, wait for one byte
 */

mod connection;
mod handshake;
mod message;

pub use connection::{Connection, Connector, LoopbackConnector};
pub use handshake::{HandshakeOutcome, NotificationClient};
pub use message::NotificationMessage;

#[cfg(test)]
pub(crate) use connection::MockConnector;
