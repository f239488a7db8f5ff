//! [`MessageConnection`]: the framed-message view of a byte stream.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use hologram_protocol::{
    Codec, JsonCodec, Message, ProtocolError, read_message, write_message,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_connection_id() -> ConnectionId {
    ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Speaks the Hologram protocol over any byte stream.
pub struct MessageConnection<S, C = JsonCodec> {
    id: ConnectionId,
    stream: S,
    codec: C,
}

impl<S> MessageConnection<S, JsonCodec>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps a stream using the default JSON codec.
    pub fn new(stream: S) -> Self {
        Self::with_codec(stream, JsonCodec)
    }
}

impl<S, C> MessageConnection<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    C: Codec,
{
    /// Wraps a stream with an explicit codec. Both ends must agree on it.
    pub fn with_codec(stream: S, codec: C) -> Self {
        Self {
            id: next_connection_id(),
            stream,
            codec,
        }
    }

    /// Gives back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S, C> Connection for MessageConnection<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    C: Codec,
{
    async fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        tracing::trace!(conn_id = %self.id, kind = msg.kind(), "send");
        write_message(&mut self.stream, &self.codec, msg)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&mut self) -> Result<Message, TransportError> {
        match read_message(&mut self.stream, &self.codec).await {
            Ok(msg) => {
                tracing::trace!(conn_id = %self.id, kind = msg.kind(), "recv");
                Ok(msg)
            }
            Err(e) if e.is_closed() => Err(TransportError::ConnectionClosed(self.id)),
            Err(e) => Err(TransportError::ReceiveFailed(e)),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| TransportError::SendFailed(ProtocolError::Io(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Dials a TCP endpoint (agent → server).
pub async fn connect_tcp(
    addr: &str,
) -> Result<MessageConnection<TcpStream>, TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(TransportError::ConnectFailed)?;
    stream.set_nodelay(true).map_err(TransportError::ConnectFailed)?;
    Ok(MessageConnection::new(stream))
}

/// Dials a local Unix socket (CLI → agent).
pub async fn connect_unix(
    path: impl AsRef<Path>,
) -> Result<MessageConnection<UnixStream>, TransportError> {
    let stream = UnixStream::connect(path)
        .await
        .map_err(TransportError::ConnectFailed)?;
    Ok(MessageConnection::new(stream))
}

#[cfg(test)]
mod tests {
    use hologram_protocol::{CHALLENGE_LEN, PingKind};

    use super::*;

    #[tokio::test]
    async fn test_send_recv_over_duplex() {
        let (a, b) = tokio::io::duplex(64);
        let mut client = MessageConnection::new(a);
        let mut server = MessageConnection::new(b);

        client.send(&Message::Ping(PingKind::Request)).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), Message::Ping(PingKind::Request));

        let challenge = Message::challenge(vec![9; CHALLENGE_LEN]);
        server.send(&challenge).await.unwrap();
        assert_eq!(client.recv().await.unwrap(), challenge);
    }

    #[tokio::test]
    async fn test_recv_after_peer_close_returns_connection_closed() {
        let (a, b) = tokio::io::duplex(64);
        let mut client = MessageConnection::new(a);
        let mut server = MessageConnection::new(b);

        client.close().await.unwrap();
        drop(client);

        let err = server.recv().await.unwrap_err();
        assert!(err.is_closed(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_recv_garbage_frame_returns_receive_failed() {
        let (mut raw, b) = tokio::io::duplex(256);
        let mut server = MessageConnection::new(b);

        // A well-formed header whose checksum does not match the body.
        let body = b"{\"type\":\"Success\"}";
        let mut frame = Vec::new();
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        frame.extend_from_slice(&0u64.to_le_bytes());
        frame.extend_from_slice(body);
        raw.write_all(&frame).await.unwrap();

        let err = server.recv().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ReceiveFailed(ProtocolError::CorruptedMessage { .. })
        ));
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let (a, b) = tokio::io::duplex(8);
        let first = MessageConnection::new(a);
        let second = MessageConnection::new(b);
        assert_ne!(first.id(), second.id());
    }
}
