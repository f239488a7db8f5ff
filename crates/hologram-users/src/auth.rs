//! The traits the server authenticates through.
//!
//! The server only ever asks two things of the user layer: "who signed
//! this?" ([`Authenticator`]) and "reload from the source of truth"
//! ([`UserCache`]). Keeping them as traits lets tests swap in stubs that
//! count calls, and lets the cache be backed by something other than a
//! directory later without touching the connection handler.

use std::future::Future;
use std::sync::Arc;

use crate::{CacheError, ChallengeSignature, User};

/// Resolves an SSH signature to a user.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared by every connection task.
/// - `'static` → lives as long as the server.
pub trait Authenticator: Send + Sync + 'static {
    /// Finds the user holding a key that verifies `signature` over
    /// `challenge`.
    ///
    /// # Returns
    /// - `Ok(Some(user))`: a cached key verified.
    /// - `Ok(None)`: no key verified (the client may try another key).
    /// - `Err(_)`: the cache could not be consulted.
    fn authenticate(
        &self,
        challenge: &[u8],
        signature: &ChallengeSignature,
    ) -> impl Future<Output = Result<Option<Arc<User>>, CacheError>> + Send;
}

/// A reloadable set of users.
pub trait UserCache: Authenticator {
    /// Rebuilds the cache from its source and swaps the new generation in.
    fn refresh(&self) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Alias for [`UserCache::refresh`].
    fn update(&self) -> impl Future<Output = Result<(), CacheError>> + Send {
        self.refresh()
    }

    /// Looks a user up by name in the current generation.
    fn find_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Option<Arc<User>>> + Send;
}
