//! Unified error type for Hologram.

use hologram_agent::AgentError;
use hologram_credentials::CredentialError;
use hologram_directory::DirectoryError;
use hologram_protocol::ProtocolError;
use hologram_transport::TransportError;
use hologram_users::CacheError;

/// Any failure the server or its background tasks can hit.
///
/// Each layer keeps its own error enum; this one wraps them so handler
/// code can use `?` across layers.
#[derive(Debug, thiserror::Error)]
pub enum HologramError {
    /// A transport-level error (connect, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire-level error (framing, checksum, encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A directory operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The user cache could not be refreshed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Credential issuance failed.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// A workstation-side failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Installing or reloading the log filter failed.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// Registering a signal handler failed.
    #[error("signal setup failed: {0}")]
    Signal(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use hologram_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed(ConnectionId::new(3));
        let hologram_err: HologramError = err.into();
        assert!(matches!(hologram_err, HologramError::Transport(_)));
        assert!(hologram_err.to_string().contains("conn-3"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let hologram_err: HologramError = err.into();
        assert!(matches!(hologram_err, HologramError::Protocol(_)));
    }

    #[test]
    fn test_from_directory_error() {
        let err = DirectoryError::network("reset");
        let hologram_err: HologramError = err.into();
        assert!(matches!(hologram_err, HologramError::Directory(_)));
    }

    #[test]
    fn test_from_credential_error() {
        let err = CredentialError::Unauthorized {
            username: "alice".into(),
            role_arn: "arn:aws:iam::1:role/x".into(),
        };
        let hologram_err: HologramError = err.into();
        assert!(matches!(hologram_err, HologramError::Credentials(_)));
        assert!(hologram_err.to_string().contains("alice"));
    }

    #[test]
    fn test_from_agent_error() {
        let hologram_err: HologramError = AgentError::NoKeysWorked.into();
        assert!(matches!(hologram_err, HologramError::Agent(_)));
    }
}
