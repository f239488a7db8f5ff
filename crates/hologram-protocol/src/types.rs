//! Core protocol types for Hologram's wire format.
//!
//! Every type in here is serialized into the payload of a frame (see
//! [`crate::write_message`]). A message carries exactly one payload, so
//! it is a Rust `enum`: "nothing set" and "two things set" are simply not
//! representable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of random bytes in every SSH challenge the server issues.
pub const CHALLENGE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

/// Direction of a ping. The server answers every `Request` with a
/// `Response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PingKind {
    Request,
    Response,
}

// ---------------------------------------------------------------------------
// ServerRequest: client → server
// ---------------------------------------------------------------------------

/// Requests a client (the workstation agent or an admin tool) sends to
/// the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "AssumeRole", "role": "engineer" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerRequest {
    /// "Give me credentials for this role." Triggers the SSH challenge.
    AssumeRole { role: String },

    /// "Give me credentials for my default role." Triggers the SSH challenge.
    GetUserCredentials,

    /// Answer to a [`ServerResponse::Challenge`]: an SSH signature over the
    /// exact challenge bytes. `format` is the SSH signature algorithm name
    /// (`ssh-ed25519`, `rsa-sha2-256`, ...), `signature` the raw blob.
    ChallengeResponse { format: String, signature: Vec<u8> },

    /// Register a new public key for a user. Authenticated by password
    /// hash instead of the challenge.
    AddSshKey {
        username: String,
        password_hash: String,
        ssh_public_key: String,
    },
}

// ---------------------------------------------------------------------------
// ServerResponse: server → client
// ---------------------------------------------------------------------------

/// Credentials as they travel on the wire.
///
/// `expiration` is seconds since the Unix epoch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: i64,
}

impl fmt::Debug for WireCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Responses the server sends during a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerResponse {
    /// "Prove you hold a key: sign these bytes."
    /// Always [`CHALLENGE_LEN`] bytes, fresh for every attempt.
    Challenge { challenge: Vec<u8> },

    /// The issued credentials. Ends a successful request.
    Credentials(WireCredentials),

    /// "No cached key verified that signature." The client may answer the
    /// next challenge with a different key.
    VerificationFailure,
}

// ---------------------------------------------------------------------------
// Message: the top-level wire type
// ---------------------------------------------------------------------------

/// The top-level wire type. Every frame carries exactly one `Message`.
///
/// `#[serde(tag = "type", content = "data")]` produces adjacently tagged
/// JSON, e.g.
///   `{ "type": "ServerRequest", "data": { "type": "GetUserCredentials" } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    /// Liveness check.
    Ping(PingKind),

    /// Client → server.
    ServerRequest(ServerRequest),

    /// Server → client.
    ServerResponse(ServerResponse),

    /// Server → client: a failure description, forwarded verbatim from
    /// whatever failed (authorization, the STS-equivalent service, ...).
    Error(String),

    /// Server → client: acknowledgement of an `AddSshKey` request.
    Success,
}

impl Message {
    /// Wraps challenge bytes in the corresponding response.
    pub fn challenge(challenge: Vec<u8>) -> Self {
        Self::ServerResponse(ServerResponse::Challenge { challenge })
    }

    /// The "try another key" response.
    pub fn verification_failure() -> Self {
        Self::ServerResponse(ServerResponse::VerificationFailure)
    }

    /// Wraps issued credentials.
    pub fn credentials(creds: WireCredentials) -> Self {
        Self::ServerResponse(ServerResponse::Credentials(creds))
    }

    /// An error message carrying the given text.
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }

    /// A short, stable name for the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping(_) => "Ping",
            Self::ServerRequest(ServerRequest::AssumeRole { .. }) => "AssumeRole",
            Self::ServerRequest(ServerRequest::GetUserCredentials) => {
                "GetUserCredentials"
            }
            Self::ServerRequest(ServerRequest::ChallengeResponse { .. }) => {
                "ChallengeResponse"
            }
            Self::ServerRequest(ServerRequest::AddSshKey { .. }) => "AddSshKey",
            Self::ServerResponse(ServerResponse::Challenge { .. }) => "Challenge",
            Self::ServerResponse(ServerResponse::Credentials(_)) => "Credentials",
            Self::ServerResponse(ServerResponse::VerificationFailure) => {
                "VerificationFailure"
            }
            Self::Error(_) => "Error",
            Self::Success => "Success",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes below are what a non-Rust peer would have to
    //! produce, so they are pinned explicitly.

    use super::*;

    fn sample_credentials() -> WireCredentials {
        WireCredentials {
            access_key_id: "AKIAEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
            expiration: 1_700_000_000,
        }
    }

    #[test]
    fn test_ping_json_format() {
        let json = serde_json::to_value(Message::Ping(PingKind::Request)).unwrap();
        assert_eq!(json["type"], "Ping");
        assert_eq!(json["data"], "Request");
    }

    #[test]
    fn test_assume_role_json_format() {
        let msg = Message::ServerRequest(ServerRequest::AssumeRole {
            role: "engineer".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ServerRequest");
        assert_eq!(json["data"]["type"], "AssumeRole");
        assert_eq!(json["data"]["role"], "engineer");
    }

    #[test]
    fn test_credentials_json_format_is_flat() {
        let json =
            serde_json::to_value(Message::credentials(sample_credentials())).unwrap();
        assert_eq!(json["data"]["type"], "Credentials");
        assert_eq!(json["data"]["access_key_id"], "AKIAEXAMPLE");
        assert_eq!(json["data"]["expiration"], 1_700_000_000);
    }

    #[test]
    fn test_success_round_trip() {
        let bytes = serde_json::to_vec(&Message::Success).unwrap();
        let decoded: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, Message::Success);
    }

    #[test]
    fn test_add_ssh_key_round_trip() {
        let msg = Message::ServerRequest(ServerRequest::AddSshKey {
            username: "alice".into(),
            password_hash: "{SSHA}abc".into(),
            ssh_public_key: "ssh-ed25519 AAAA alice@laptop".into(),
        });
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_payload_without_variant_returns_error() {
        let result: Result<Message, _> = serde_json::from_str(r#"{"data": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_payload_naming_two_variants_returns_error() {
        // The old optional-field shape with two fields populated.
        let ambiguous = r#"{"Ping": "Request", "Error": "boom"}"#;
        let result: Result<Message, _> = serde_json::from_str(ambiguous);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_variant_returns_error() {
        let unknown = r#"{"type": "FlyToMoon", "data": null}"#;
        let result: Result<Message, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_wire_credentials_debug_redacts_secrets() {
        let text = format!("{:?}", sample_credentials());
        assert!(text.contains("AKIAEXAMPLE"));
        assert!(!text.contains("secret\""));
        assert!(!text.contains("token\""));
    }

    #[test]
    fn test_kind_names_nested_variant() {
        assert_eq!(Message::verification_failure().kind(), "VerificationFailure");
        assert_eq!(Message::challenge(vec![0; CHALLENGE_LEN]).kind(), "Challenge");
        assert_eq!(Message::error("x").kind(), "Error");
    }
}
