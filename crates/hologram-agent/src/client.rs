//! [`RemoteClient`]: requests credentials from a Hologram server.
//!
//! # Conversation
//!
//! ```text
//! client                           server
//!   │── AssumeRole / GetUserCreds ──→│
//!   │←──────── Challenge ────────────│
//!   │── ChallengeResponse (key 0) ──→│
//!   │←──── VerificationFailure ──────│   skip = 1
//!   │←──────── Challenge ────────────│
//!   │── ChallengeResponse (key 1) ──→│
//!   │←──────── Credentials ──────────│
//! ```
//!
//! Every request opens a fresh connection; nothing is kept between
//! requests.

use std::future::Future;

use hologram_credentials::Credentials;
use hologram_protocol::{Message, PingKind, ServerRequest, ServerResponse};
use hologram_transport::{Connection, connect_tcp};

use crate::{AgentError, ChallengeSigner};

/// Something that can obtain credentials on the user's behalf.
pub trait Client: Send + Sync + 'static {
    /// Credentials for a specific role.
    fn assume_role(
        &self,
        role: &str,
    ) -> impl Future<Output = Result<Credentials, AgentError>> + Send;

    /// Credentials for the user's default role.
    fn get_user_credentials(
        &self,
    ) -> impl Future<Output = Result<Credentials, AgentError>> + Send;
}

/// Talks to a Hologram server over TCP, signing challenges with `S`.
pub struct RemoteClient<S> {
    address: String,
    signer: S,
}

impl<S: ChallengeSigner> RemoteClient<S> {
    /// `address` is a `host:port` the server listens on.
    pub fn new(address: impl Into<String>, signer: S) -> Self {
        Self {
            address: address.into(),
            signer,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Checks that the server is alive.
    pub async fn ping(&self) -> Result<(), AgentError> {
        let mut conn = connect_tcp(&self.address).await?;
        ping_over(&mut conn).await
    }

    /// Registers `ssh_public_key` for `username`, authenticated by the
    /// user's password hash.
    pub async fn add_ssh_key(
        &self,
        username: &str,
        password_hash: &str,
        ssh_public_key: &str,
    ) -> Result<(), AgentError> {
        let mut conn = connect_tcp(&self.address).await?;
        add_ssh_key_over(&mut conn, username, password_hash, ssh_public_key).await
    }

    /// Runs one credential request over an already-open connection.
    pub async fn request_over<C: Connection>(
        &self,
        conn: &mut C,
        request: ServerRequest,
    ) -> Result<Credentials, AgentError> {
        conn.send(&Message::ServerRequest(request)).await?;

        let mut skip = 0;
        loop {
            match conn.recv().await? {
                Message::ServerResponse(ServerResponse::Challenge { challenge }) => {
                    let signature = self
                        .signer
                        .sign(&challenge, skip)
                        .await?
                        .ok_or(AgentError::NoKeysWorked)?;
                    conn.send(&Message::ServerRequest(ServerRequest::ChallengeResponse {
                        format: signature.format,
                        signature: signature.blob,
                    }))
                    .await?;
                }
                Message::ServerResponse(ServerResponse::Credentials(wire)) => {
                    tracing::debug!(access_key_id = %wire.access_key_id, "received credentials");
                    return Ok(Credentials::try_from(wire)?);
                }
                Message::ServerResponse(ServerResponse::VerificationFailure) => {
                    // Try the next key.
                    skip += 1;
                    tracing::debug!(skip, "key rejected by server");
                }
                Message::Error(text) => return Err(AgentError::Server(text)),
                other => return Err(AgentError::UnexpectedMessage(other.kind())),
            }
        }
    }

    async fn request(&self, request: ServerRequest) -> Result<Credentials, AgentError> {
        let mut conn = connect_tcp(&self.address).await?;
        let result = self.request_over(&mut conn, request).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "error closing server connection");
        }
        result
    }
}

/// Sends a ping and waits for the response.
pub(crate) async fn ping_over<C: Connection>(conn: &mut C) -> Result<(), AgentError> {
    conn.send(&Message::Ping(PingKind::Request)).await?;
    match conn.recv().await? {
        Message::Ping(PingKind::Response) => Ok(()),
        Message::Error(text) => Err(AgentError::Server(text)),
        other => Err(AgentError::UnexpectedMessage(other.kind())),
    }
}

pub(crate) async fn add_ssh_key_over<C: Connection>(
    conn: &mut C,
    username: &str,
    password_hash: &str,
    ssh_public_key: &str,
) -> Result<(), AgentError> {
    conn.send(&Message::ServerRequest(ServerRequest::AddSshKey {
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        ssh_public_key: ssh_public_key.to_string(),
    }))
    .await?;
    match conn.recv().await? {
        Message::Success => Ok(()),
        Message::Error(text) => Err(AgentError::Server(text)),
        other => Err(AgentError::UnexpectedMessage(other.kind())),
    }
}

impl<S: ChallengeSigner> Client for RemoteClient<S> {
    async fn assume_role(&self, role: &str) -> Result<Credentials, AgentError> {
        self.request(ServerRequest::AssumeRole {
            role: role.to_string(),
        })
        .await
    }

    async fn get_user_credentials(&self) -> Result<Credentials, AgentError> {
        self.request(ServerRequest::GetUserCredentials).await
    }
}
