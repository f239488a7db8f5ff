//! Signing server challenges with the user's SSH keys.
//!
//! Two sources are supported: the user's ssh-agent ([`AgentSocketSigner`])
//! and unencrypted keys loaded into memory ([`KeyringSigner`]). Either is
//! configured per client, never process-wide.

use std::future::Future;
use std::path::{Path, PathBuf};

use hologram_users::ChallengeSignature;
use signature::Signer as _;
use ssh_agent_lib::agent::Session as _;
use ssh_agent_lib::client::Client;
use ssh_agent_lib::proto::SignRequest;
use ssh_key::public::KeyData;
use ssh_key::{HashAlg, PrivateKey};
use tokio::net::UnixStream;

use crate::AgentError;

/// `SSH_AGENT_RSA_SHA2_512`: ask the agent for `rsa-sha2-512` instead of
/// SHA-1 `ssh-rsa`, which the server does not accept.
const RSA_SHA2_512: u32 = 0x04;

/// Produces SSH signatures over server challenges.
///
/// Keys are addressed by position. After a verification failure the
/// client asks for the next one by bumping `skip`.
pub trait ChallengeSigner: Send + Sync + 'static {
    /// Signs `challenge` with the key at index `skip`.
    ///
    /// Returns `Ok(None)` once `skip` runs past the last key.
    fn sign(
        &self,
        challenge: &[u8],
        skip: usize,
    ) -> impl Future<Output = Result<Option<ChallengeSignature>, AgentError>> + Send;
}

fn sign_with_key(key: &PrivateKey, challenge: &[u8]) -> Result<ChallengeSignature, AgentError> {
    let sig: ssh_key::Signature = key
        .try_sign(challenge)
        .map_err(|e| AgentError::Signing(e.to_string()))?;
    Ok(ChallengeSignature::from(&sig))
}

// ---------------------------------------------------------------------------
// KeyringSigner
// ---------------------------------------------------------------------------

/// An in-memory list of unencrypted private keys.
#[derive(Default)]
pub struct KeyringSigner {
    keys: Vec<PrivateKey>,
}

impl KeyringSigner {
    pub fn new(keys: Vec<PrivateKey>) -> Self {
        Self { keys }
    }

    /// Loads an OpenSSH private key file. Encrypted keys are rejected.
    pub fn add_key_file(&mut self, path: impl AsRef<Path>) -> Result<(), AgentError> {
        let path = path.as_ref();
        let key = PrivateKey::read_openssh_file(path)
            .map_err(|e| AgentError::Signing(format!("{}: {e}", path.display())))?;
        if key.is_encrypted() {
            return Err(AgentError::Signing(format!("{}: key is encrypted", path.display())));
        }
        self.keys.push(key);
        Ok(())
    }

    pub fn add_key(&mut self, key: PrivateKey) {
        self.keys.push(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ChallengeSigner for KeyringSigner {
    async fn sign(
        &self,
        challenge: &[u8],
        skip: usize,
    ) -> Result<Option<ChallengeSignature>, AgentError> {
        let Some(key) = self.keys.get(skip) else {
            return Ok(None);
        };
        tracing::debug!(
            skip,
            algorithm = %key.algorithm(),
            fingerprint = %key.fingerprint(HashAlg::Sha256),
            "signing challenge"
        );
        sign_with_key(key, challenge).map(Some)
    }
}

// ---------------------------------------------------------------------------
// AgentSocketSigner
// ---------------------------------------------------------------------------

/// Signs through an ssh-agent listening on a Unix socket.
///
/// Every call connects afresh, lists the agent's identities and signs
/// with the one at `skip`, so keys added to the agent mid-session are
/// picked up. Without a socket the fallback key is used, and only for
/// the first attempt.
pub struct AgentSocketSigner {
    socket: Option<PathBuf>,
    fallback: Option<PrivateKey>,
}

impl AgentSocketSigner {
    pub fn new(socket: Option<PathBuf>, fallback: Option<PrivateKey>) -> Self {
        Self { socket, fallback }
    }

    /// Uses `SSH_AUTH_SOCK` when it is set and non-empty.
    pub fn from_env(fallback: Option<PrivateKey>) -> Self {
        let socket = std::env::var_os("SSH_AUTH_SOCK")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self::new(socket, fallback)
    }

    pub fn socket(&self) -> Option<&Path> {
        self.socket.as_deref()
    }

    fn sign_with_fallback(
        &self,
        challenge: &[u8],
        skip: usize,
    ) -> Result<Option<ChallengeSignature>, AgentError> {
        // A rejected fallback key would otherwise be offered forever.
        if skip > 0 {
            return Err(AgentError::FallbackKey);
        }
        let key = self.fallback.as_ref().ok_or(AgentError::FallbackKey)?;
        tracing::debug!(fingerprint = %key.fingerprint(HashAlg::Sha256), "falling back on provided key");
        sign_with_key(key, challenge).map(Some)
    }
}

fn agent_error(socket: &Path, err: impl std::fmt::Display) -> AgentError {
    AgentError::SshAgent(format!("{}: {err}", socket.display()))
}

async fn sign_with_agent(
    socket: &Path,
    challenge: &[u8],
    skip: usize,
) -> Result<Option<ChallengeSignature>, AgentError> {
    let stream = UnixStream::connect(socket)
        .await
        .map_err(|e| agent_error(socket, e))?;
    let mut client = Client::new(stream);

    let identities = client
        .request_identities()
        .await
        .map_err(|e| agent_error(socket, e))?;
    if identities.is_empty() {
        return Err(AgentError::NoAgentKeys);
    }
    let Some(identity) = identities.into_iter().nth(skip) else {
        return Ok(None);
    };

    tracing::debug!(
        skip,
        fingerprint = %identity.pubkey.fingerprint(HashAlg::Sha256),
        comment = %identity.comment,
        "signing challenge through ssh-agent"
    );

    let flags = match identity.pubkey {
        KeyData::Rsa(_) => RSA_SHA2_512,
        _ => 0,
    };
    let sig = client
        .sign(SignRequest {
            pubkey: identity.pubkey,
            data: challenge.to_vec(),
            flags,
        })
        .await
        .map_err(|e| agent_error(socket, e))?;
    Ok(Some(ChallengeSignature::from(&sig)))
}

impl ChallengeSigner for AgentSocketSigner {
    async fn sign(
        &self,
        challenge: &[u8],
        skip: usize,
    ) -> Result<Option<ChallengeSignature>, AgentError> {
        match &self.socket {
            Some(socket) => sign_with_agent(socket, challenge, skip).await,
            None => self.sign_with_fallback(challenge, skip),
        }
    }
}
