//! Temporary credentials.

use std::fmt;

use chrono::{DateTime, Utc};
use hologram_protocol::WireCredentials;
use serde::{Deserialize, Serialize};

use crate::CredentialError;

/// A temporary credential set as issued by the STS-equivalent service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl Credentials {
    /// `true` once the expiration time has been reached.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl From<Credentials> for WireCredentials {
    fn from(creds: Credentials) -> Self {
        WireCredentials {
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: creds.session_token,
            expiration: creds.expiration.timestamp(),
        }
    }
}

impl TryFrom<WireCredentials> for Credentials {
    type Error = CredentialError;

    fn try_from(wire: WireCredentials) -> Result<Self, Self::Error> {
        let expiration = DateTime::from_timestamp(wire.expiration, 0)
            .ok_or(CredentialError::InvalidExpiration(wire.expiration))?;
        Ok(Credentials {
            access_key_id: wire.access_key_id,
            secret_access_key: wire.secret_access_key,
            session_token: wire.session_token,
            expiration,
        })
    }
}
