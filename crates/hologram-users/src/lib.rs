//! Users, groups and SSH challenge authentication for Hologram.
//!
//! This crate turns directory entries into [`User`]s and answers the one
//! question the server asks during a challenge: "which user holds a key
//! that produced this signature over these bytes?"
//!
//! - [`User`] / [`Group`]: the cached identity and role grants.
//! - [`Authenticator`] / [`UserCache`]: the traits the server depends on.
//! - [`DirectoryUserCache`]: the implementation backed by a
//!   [`hologram_directory::Directory`].
//! - [`Stats`]: named counters and timings, injected by the embedder.

mod auth;
mod cache;
mod error;
mod keys;
mod stats;
mod user;

pub use auth::{Authenticator, UserCache};
pub use cache::{CacheConfig, DEFAULT_SESSION_TIMEOUT_SECS, DirectoryUserCache};
pub use error::CacheError;
pub use keys::{parse_public_key, same_key_material, verify_signature};
pub use stats::{MemoryStats, NoopStats, Stats, TracingStats};
pub use user::{ChallengeSignature, Group, User};
