//! Directory error types.

use std::fmt;

/// Coarse classification of a directory failure.
///
/// Only [`ErrorKind::Network`] is treated specially: it is the one kind
/// [`crate::ResilientDirectory`] answers with a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection to the directory is broken.
    Network,
    /// The directory rejected the request (bad filter, schema violation).
    Protocol,
    /// The target entry does not exist.
    NotFound,
    /// Anything else.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Protocol => write!(f, "protocol"),
            Self::NotFound => write!(f, "not found"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// An error returned by a [`crate::Directory`] operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("directory {kind} error: {message}")]
pub struct DirectoryError {
    kind: ErrorKind,
    message: String,
}

impl DirectoryError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`ErrorKind::Network`] error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The backend's description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the connection should be re-established.
    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }
}
