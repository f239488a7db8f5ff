//! Error types for the agent.

use hologram_credentials::CredentialError;
use hologram_transport::TransportError;

/// Errors that can occur on the workstation side.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Nothing was ever fetched, so there is nothing to refresh.
    #[error("No credentials set. Please activate hologram from the CLI first")]
    NoCredentials,

    /// The server rejected every key in the keyring.
    #[error("No keys worked")]
    NoKeysWorked,

    /// The server answered with an error message, forwarded verbatim.
    #[error("{0}")]
    Server(String),

    /// The server sent something that makes no sense at this point.
    #[error("unexpected message from server: {0}")]
    UnexpectedMessage(&'static str),

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The ssh-agent could not be reached or refused a request.
    #[error("ssh-agent: {0}")]
    SshAgent(String),

    /// The ssh-agent is reachable but holds no identities.
    #[error("No keys available in ssh-agent")]
    NoAgentKeys,

    /// There is no agent socket and the fallback key is missing or was
    /// already tried.
    #[error("Could not use the provided SSH key.")]
    FallbackKey,

    /// Talking to the server failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server's credentials could not be interpreted.
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}
