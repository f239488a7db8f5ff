//! Directory boundary for Hologram.
//!
//! The server never talks to a concrete LDAP client. Everything it needs
//! from the directory is two operations, captured by [`Directory`]:
//!
//! - [`Directory::search`]: find entries under a base DN that match a
//!   [`Filter`], returning the requested attributes.
//! - [`Directory::modify`]: add attribute values to an entry.
//!
//! On top of that boundary this crate provides:
//!
//! - [`ResilientDirectory`]: reconnects once through a
//!   [`DirectoryConnector`] when an operation fails with a network error.
//! - [`MemoryDirectory`]: an in-process directory used for tests and
//!   local development.
//! - [`DirectorySchema`]: the configurable attribute names.

mod config;
mod error;
mod memory;
mod resilient;
mod types;

pub use config::DirectorySchema;
pub use error::{DirectoryError, ErrorKind};
pub use memory::MemoryDirectory;
pub use resilient::ResilientDirectory;
pub use types::{Entry, Filter, ModifyRequest, SearchRequest};

use std::future::Future;
use std::sync::Arc;

/// A connection to a directory service.
///
/// Implementations must be shareable across connection-handler tasks.
pub trait Directory: Send + Sync + 'static {
    /// Searches the subtree under `req.base_dn`.
    fn search(
        &self,
        req: &SearchRequest,
    ) -> impl Future<Output = Result<Vec<Entry>, DirectoryError>> + Send;

    /// Applies the attribute additions in `req`.
    fn modify(
        &self,
        req: &ModifyRequest,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

/// Opens fresh directory connections.
///
/// Used by [`ResilientDirectory`] for the initial connection and for
/// every reconnect.
pub trait DirectoryConnector: Send + Sync + 'static {
    /// The connection type produced.
    type Connection: Directory;

    /// Opens a new connection.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, DirectoryError>> + Send;
}

impl<D: Directory> Directory for Arc<D> {
    fn search(
        &self,
        req: &SearchRequest,
    ) -> impl Future<Output = Result<Vec<Entry>, DirectoryError>> + Send {
        (**self).search(req)
    }

    fn modify(
        &self,
        req: &ModifyRequest,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send {
        (**self).modify(req)
    }
}
