//! Transport layer for Hologram.
//!
//! Provides the [`Connection`] and [`Transport`] traits plus their
//! implementation over any byte stream:
//!
//! - [`MessageConnection`] frames [`Message`]s over an `AsyncRead +
//!   AsyncWrite` stream (TCP, Unix socket, or an in-memory duplex in tests).
//! - [`TcpTransport`] accepts agent → server connections.
//! - [`UnixTransport`] accepts CLI → agent connections on a local socket.
//!
//! The CLI → agent leg is the embedder's entry point: the workstation
//! daemon binds a [`UnixTransport`] (mode 0777, so any local user's CLI
//! can reach it) and serves requests from it, and the CLI dials it with
//! [`connect_unix`]. No crate in this workspace runs that listener itself.
//!
//! The protocol is strictly request/response on a connection, so a
//! connection is driven by one task through `&mut self` and never split.

mod connection;
mod error;
mod listener;

pub use connection::{MessageConnection, connect_tcp, connect_unix};
pub use error::TransportError;
pub use listener::{TcpTransport, UnixTransport};

use std::fmt;
use std::future::Future;

use hologram_protocol::Message;

/// Opaque identifier for a connection, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener handing out framed connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    /// Waits for the next peer.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that exchanges whole protocol messages.
pub trait Connection: Send + 'static {
    /// Frames and sends one message.
    fn send(
        &mut self,
        msg: &Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next message.
    ///
    /// Returns [`TransportError::ConnectionClosed`] when the peer hung up
    /// between frames.
    fn recv(&mut self) -> impl Future<Output = Result<Message, TransportError>> + Send;

    /// Shuts down the write half of the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Process-unique id, for log fields.
    fn id(&self) -> ConnectionId;
}
