//! [`CredentialsExpirationManager`]: hands out credentials, refreshing
//! them when they have expired.

use hologram_credentials::Credentials;
use tokio::sync::Mutex;

use crate::{AgentError, Client};

/// The last credentials and how they were obtained.
struct Held {
    creds: Credentials,
    /// The role passed to `assume_role`, or `None` if they came from
    /// `get_user_credentials`. A refresh repeats the same call.
    role: Option<String>,
}

/// Caches the last-issued credentials for the local metadata service.
///
/// The lock is held through a refresh, so callers that arrive while one
/// is in flight wait for it and then see the new credentials instead of
/// starting a second refresh.
pub struct CredentialsExpirationManager<C> {
    client: C,
    held: Mutex<Option<Held>>,
}

impl<C: Client> CredentialsExpirationManager<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            held: Mutex::new(None),
        }
    }

    /// Overwrites the cached credentials.
    pub async fn set_credentials(&self, creds: Credentials, role: Option<String>) {
        *self.held.lock().await = Some(Held { creds, role });
    }

    /// Fetches credentials for `role` and remembers them.
    pub async fn assume_role(&self, role: &str) -> Result<Credentials, AgentError> {
        let creds = self.client.assume_role(role).await?;
        self.set_credentials(creds.clone(), Some(role.to_string())).await;
        Ok(creds)
    }

    /// Fetches the user's default credentials and remembers them.
    pub async fn get_user_credentials(&self) -> Result<Credentials, AgentError> {
        let creds = self.client.get_user_credentials().await?;
        self.set_credentials(creds.clone(), None).await;
        Ok(creds)
    }

    /// Returns valid credentials, refreshing them first if they expired.
    ///
    /// Fails with [`AgentError::NoCredentials`] if none were ever set.
    pub async fn get_credentials(&self) -> Result<Credentials, AgentError> {
        let mut held = self.held.lock().await;
        let current = held.as_mut().ok_or(AgentError::NoCredentials)?;

        if current.creds.is_expired() {
            tracing::info!(role = ?current.role, "credentials expired, refreshing");
            current.creds = match &current.role {
                Some(role) => self.client.assume_role(role).await?,
                None => self.client.get_user_credentials().await?,
            };
        }
        Ok(current.creds.clone())
    }
}
