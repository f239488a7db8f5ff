//! SSH public key parsing and signature verification.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use signature::Verifier;
use ssh_key::PublicKey;
use ssh_key::authorized_keys;

use crate::ChallengeSignature;

/// Parses a public key as stored in the directory.
///
/// Two encodings are accepted: the base64 of the SSH wire blob, and an
/// authorized-keys line (`ssh-ed25519 AAAA... comment`), optionally
/// prefixed with options such as `from="10.0.0.0/8",no-pty`. The blob
/// form is tried first.
pub fn parse_public_key(raw: &str) -> Result<PublicKey, ssh_key::Error> {
    let raw = raw.trim();
    if let Ok(blob) = STANDARD.decode(raw) {
        if let Ok(key) = PublicKey::from_bytes(&blob) {
            return Ok(key);
        }
    }
    match PublicKey::from_openssh(raw) {
        Ok(key) => Ok(key),
        Err(err) => raw
            .parse::<authorized_keys::Entry>()
            .map(PublicKey::from)
            .map_err(|_| err),
    }
}

/// Returns `true` if `key` produced `signature` over `challenge`.
pub fn verify_signature(
    key: &PublicKey,
    challenge: &[u8],
    signature: &ssh_key::Signature,
) -> bool {
    // `PublicKey::verify` is the SSHSIG (namespaced) check; challenges
    // are signed raw.
    Verifier::verify(key, challenge, signature).is_ok()
}

/// `true` if two stored keys are the same key: equal strings, or both
/// parse to the same key material (comments and encoding ignored).
pub fn same_key_material(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse_public_key(a), parse_public_key(b)) {
        (Ok(a), Ok(b)) => a.key_data() == b.key_data(),
        _ => false,
    }
}

impl ChallengeSignature {
    /// Verifies against `key`. A malformed signature never verifies.
    pub fn verify_with(&self, key: &PublicKey, challenge: &[u8]) -> bool {
        self.to_ssh_signature()
            .is_some_and(|sig| verify_signature(key, challenge, &sig))
    }
}
