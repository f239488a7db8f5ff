//! Cached identities.

use std::sync::Arc;

use ssh_key::PublicKey;

/// A role-granting directory group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Distinguished name; users reference groups by it.
    pub dn: String,

    /// Role ARNs (or role shorthands) members may assume.
    pub role_arns: Vec<String>,

    /// Session duration, in seconds, for credentials issued through
    /// this group.
    pub session_timeout_secs: u64,
}

/// A user as seen by the server after a cache refresh.
///
/// Users are immutable: a refresh builds a new `User` rather than
/// editing the old one, so an `Arc<User>` handed to a connection stays
/// consistent for the rest of that request.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub ssh_public_keys: Vec<PublicKey>,
    pub groups: Vec<Arc<Group>>,
    pub default_role: String,
}

/// An SSH signature exactly as a client sent it.
///
/// `format` is the signature algorithm name (`ssh-ed25519`,
/// `rsa-sha2-512`, ...) and `blob` the raw signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeSignature {
    pub format: String,
    pub blob: Vec<u8>,
}

impl ChallengeSignature {
    pub fn new(format: impl Into<String>, blob: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            blob,
        }
    }

    /// Parses into an [`ssh_key::Signature`]. `None` if the algorithm is
    /// unknown or the blob has the wrong shape for it.
    pub fn to_ssh_signature(&self) -> Option<ssh_key::Signature> {
        let algorithm = ssh_key::Algorithm::new(&self.format).ok()?;
        ssh_key::Signature::new(algorithm, self.blob.clone()).ok()
    }
}

impl From<&ssh_key::Signature> for ChallengeSignature {
    fn from(sig: &ssh_key::Signature) -> Self {
        Self {
            format: sig.algorithm().as_str().to_string(),
            blob: sig.as_bytes().to_vec(),
        }
    }
}
