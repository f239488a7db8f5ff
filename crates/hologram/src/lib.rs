//! # Hologram
//!
//! Short-lived cloud credentials for engineers, authenticated by the SSH
//! keys they already have.
//!
//! A workstation agent asks the server for credentials. The server answers
//! with a random challenge, the agent signs it with one of the user's SSH
//! keys, and the server matches the signature against public keys cached
//! from a directory. A verified user gets credentials for a role their
//! directory groups grant.
//!
//! This crate wires the layers together. The pieces live in their own
//! crates and are re-exported from [`prelude`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hologram::prelude::*;
//!
//! let _log = hologram::logging::init(false)?;
//! let directory = ResilientDirectory::connect(my_ldap_connector).await?;
//! let users = DirectoryUserCache::load(directory, CacheConfig::default(), Arc::new(TracingStats)).await?;
//! let credentials = DirectCredentialService::new(my_sts, IssuanceConfig::default());
//!
//! let server = HologramServer::builder()
//!     .bind("0.0.0.0:3100")
//!     .build(users, credentials, my_directory)
//!     .await?;
//! server.run().await
//! ```

mod error;
mod handler;
pub mod logging;
mod server;

pub use error::HologramError;
pub use server::{HologramServer, HologramServerBuilder, ServerConfig};

pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::logging::LogLevelHandle;
    pub use crate::{HologramError, HologramServer, HologramServerBuilder, ServerConfig};

    pub use hologram_agent::{
        AgentError, AgentSocketSigner, ChallengeSigner, Client, CredentialsExpirationManager,
        KeyringSigner, RemoteClient,
    };
    pub use hologram_credentials::{
        AssumeRoleRequest, CredentialError, CredentialService, Credentials,
        DirectCredentialService, IssuanceConfig, Sts, StsError, build_arn,
    };
    pub use hologram_directory::{
        Directory, DirectoryConnector, DirectoryError, DirectorySchema, Entry, ErrorKind, Filter,
        MemoryDirectory, ModifyRequest, ResilientDirectory, SearchRequest,
    };
    pub use hologram_protocol::{Message, PingKind, ServerRequest, ServerResponse};
    pub use hologram_transport::{
        Connection, ConnectionId, MessageConnection, TcpTransport, Transport, TransportError,
        UnixTransport, connect_tcp, connect_unix,
    };
    pub use hologram_users::{
        Authenticator, CacheConfig, CacheError, ChallengeSignature, DirectoryUserCache, Group,
        MemoryStats, NoopStats, Stats, TracingStats, User, UserCache,
    };
}
