//! The workstation side of Hologram.
//!
//! - [`RemoteClient`] speaks to the server: sends a request, answers
//!   each SSH challenge with the next key of its [`ChallengeSigner`], and
//!   returns the issued credentials.
//! - [`AgentSocketSigner`] signs through the user's ssh-agent, and
//!   [`KeyringSigner`] through keys held in memory.
//! - [`CredentialsExpirationManager`] remembers the last credentials and
//!   how they were obtained, and transparently fetches new ones once
//!   they expire.

mod client;
mod error;
mod manager;
mod signer;

pub use client::{Client, RemoteClient};
pub use error::AgentError;
pub use manager::CredentialsExpirationManager;
pub use signer::{AgentSocketSigner, ChallengeSigner, KeyringSigner};
