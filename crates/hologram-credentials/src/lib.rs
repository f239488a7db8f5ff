//! Credential issuance for Hologram.
//!
//! Once the server knows *who* is asking, this crate decides *what* they
//! get:
//!
//! 1. [`build_arn`] turns whatever the client typed (`engineer`,
//!    `prod/deploy`, a full ARN) into a canonical role ARN.
//! 2. [`DirectCredentialService`] checks that ARN against the user's
//!    group grants (when enforcement is on) and picks the session
//!    duration.
//! 3. The injected [`Sts`] implementation exchanges it for temporary
//!    [`Credentials`].
//!
//! The STS client itself is outside this crate: anything implementing
//! [`Sts`] will do.

mod arn;
mod credentials;
mod error;
mod service;
mod sts;

pub use arn::build_arn;
pub use credentials::Credentials;
pub use error::{CredentialError, StsError};
pub use service::{CredentialService, DirectCredentialService, IssuanceConfig};
pub use sts::{AssumeRoleRequest, Sts};
