//! The STS boundary.

use std::future::Future;
use std::sync::Arc;

use crate::{Credentials, StsError};

/// Parameters of a role assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    /// Shows up in the cloud provider's audit trail. Hologram uses the
    /// username.
    pub session_name: String,
    pub duration_secs: u64,
}

/// The external service that mints temporary credentials.
pub trait Sts: Send + Sync + 'static {
    /// Assumes a role on behalf of a session.
    fn assume_role(
        &self,
        req: AssumeRoleRequest,
    ) -> impl Future<Output = Result<Credentials, StsError>> + Send;

    /// Issues a session token not tied to any role.
    fn get_session_token(
        &self,
        duration_secs: u64,
    ) -> impl Future<Output = Result<Credentials, StsError>> + Send;
}

impl<S: Sts> Sts for Arc<S> {
    fn assume_role(
        &self,
        req: AssumeRoleRequest,
    ) -> impl Future<Output = Result<Credentials, StsError>> + Send {
        (**self).assume_role(req)
    }

    fn get_session_token(
        &self,
        duration_secs: u64,
    ) -> impl Future<Output = Result<Credentials, StsError>> + Send {
        (**self).get_session_token(duration_secs)
    }
}
