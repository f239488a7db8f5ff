//! Error types for credential issuance.

/// A failure reported by the STS-equivalent service.
///
/// The message is forwarded to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StsError(pub String);

impl StsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur while issuing credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// None of the user's groups grants the requested role.
    /// The STS-equivalent service was not contacted.
    #[error("User {username} is not authorized to assume role {role_arn}!")]
    Unauthorized { username: String, role_arn: String },

    /// The STS-equivalent service refused or failed.
    #[error(transparent)]
    Sts(#[from] StsError),

    /// An expiration timestamp outside the representable range.
    #[error("invalid credential expiration timestamp {0}")]
    InvalidExpiration(i64),
}
