use hologram_protocol::ProtocolError;

use crate::ConnectionId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection between frames.
    #[error("connection {0} closed")]
    ConnectionClosed(ConnectionId),

    /// Framing or writing an outgoing message failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] ProtocolError),

    /// Reading, checksumming or decoding an incoming frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] ProtocolError),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Dialing the remote end failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Returns `true` for the normal end of a conversation.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_))
    }
}
