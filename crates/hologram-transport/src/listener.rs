//! Listeners producing [`MessageConnection`]s.

use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};

use crate::connection::MessageConnection;
use crate::{Transport, TransportError};

/// TCP listener for agent → server connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener actually bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = MessageConnection<TcpStream>;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "could not set TCP_NODELAY");
        }

        let conn = MessageConnection::new(stream);
        tracing::debug!(conn_id = %crate::Connection::id(&conn), %addr, "accepted TCP connection");
        Ok(conn)
    }
}

/// Unix-domain listener for CLI → agent connections.
///
/// The agent runs as root while the CLI runs as the user, so the socket
/// is made world-writable after binding. The socket file is removed when
/// the transport is dropped.
pub struct UnixTransport {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixTransport {
    /// Binds the socket at `path`, replacing a stale socket file.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TransportError::AcceptFailed(e)),
        }

        let listener = UnixListener::bind(&path).map_err(TransportError::AcceptFailed)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o777))
            .map_err(TransportError::AcceptFailed)?;

        tracing::info!(path = %path.display(), "Unix transport listening");
        Ok(Self { listener, path })
    }

    /// Path of the bound socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for UnixTransport {
    type Connection = MessageConnection<UnixStream>;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = MessageConnection::new(stream);
        tracing::debug!(conn_id = %crate::Connection::id(&conn), "accepted local connection");
        Ok(conn)
    }
}

impl Drop for UnixTransport {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
