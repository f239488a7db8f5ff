//! Authorization and issuance.

use std::collections::BTreeMap;
use std::future::Future;

use hologram_users::{DEFAULT_SESSION_TIMEOUT_SECS, User};
use serde::{Deserialize, Serialize};

use crate::{AssumeRoleRequest, CredentialError, Credentials, Sts, build_arn};

/// Account settings for issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuanceConfig {
    /// Account bare role names resolve into.
    pub account: String,

    /// Short names for other accounts, e.g. `prod` →
    /// `arn:aws:iam::123456789012`.
    pub account_aliases: BTreeMap<String, String>,

    /// Lifetime of tokens from [`CredentialService::get_session_token`].
    pub session_token_duration_secs: u64,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            account_aliases: BTreeMap::new(),
            session_token_duration_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        }
    }
}

/// Issues credentials for authenticated users.
pub trait CredentialService: Send + Sync + 'static {
    /// Issues credentials for `role` on behalf of `user`.
    ///
    /// With `enforce` set, the role must be granted by one of the user's
    /// groups; otherwise this fails with
    /// [`CredentialError::Unauthorized`] before any external call.
    fn assume_role(
        &self,
        user: &User,
        role: &str,
        enforce: bool,
    ) -> impl Future<Output = Result<Credentials, CredentialError>> + Send;

    /// Issues a bare session token. No authorization check.
    fn get_session_token(
        &self,
        user: &User,
    ) -> impl Future<Output = Result<Credentials, CredentialError>> + Send;
}

/// Talks to the STS-equivalent service directly.
pub struct DirectCredentialService<S> {
    sts: S,
    config: IssuanceConfig,
}

impl<S: Sts> DirectCredentialService<S> {
    pub fn new(sts: S, config: IssuanceConfig) -> Self {
        Self { sts, config }
    }

    pub fn config(&self) -> &IssuanceConfig {
        &self.config
    }

    fn arn(&self, role: &str) -> String {
        build_arn(role, &self.config.account, &self.config.account_aliases)
    }

    /// Session duration granted for `arn`, or `None` if no group of the
    /// user grants it. When several groups grant it, the last one wins.
    fn granted_duration(&self, user: &User, arn: &str) -> Option<u64> {
        user.groups
            .iter()
            .rev()
            .find(|group| group.role_arns.iter().any(|granted| self.arn(granted) == arn))
            .map(|group| group.session_timeout_secs)
    }
}

impl<S: Sts> CredentialService for DirectCredentialService<S> {
    async fn assume_role(
        &self,
        user: &User,
        role: &str,
        enforce: bool,
    ) -> Result<Credentials, CredentialError> {
        let role_arn = self.arn(role);
        tracing::debug!(username = %user.username, %role_arn, enforce, "checking role");

        let duration_secs = if enforce {
            self.granted_duration(user, &role_arn)
                .ok_or_else(|| CredentialError::Unauthorized {
                    username: user.username.clone(),
                    role_arn: role_arn.clone(),
                })?
        } else {
            DEFAULT_SESSION_TIMEOUT_SECS
        };

        let creds = self
            .sts
            .assume_role(AssumeRoleRequest {
                role_arn,
                session_name: user.username.clone(),
                duration_secs,
            })
            .await?;
        Ok(creds)
    }

    async fn get_session_token(&self, user: &User) -> Result<Credentials, CredentialError> {
        tracing::debug!(username = %user.username, "issuing session token");
        let creds = self
            .sts
            .get_session_token(self.config.session_token_duration_secs)
            .await?;
        Ok(creds)
    }
}
