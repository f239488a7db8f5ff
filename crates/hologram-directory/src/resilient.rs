//! [`ResilientDirectory`]: one reconnect on network failure.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    Directory, DirectoryConnector, DirectoryError, Entry, ModifyRequest, SearchRequest,
};

/// Wraps a directory connection and re-opens it when it breaks.
///
/// When an operation fails with [`crate::ErrorKind::Network`] the
/// wrapper opens a fresh connection through its connector, swaps it in,
/// and retries the operation exactly once on the fresh connection.
/// Whatever that retry returns is returned to the caller unchanged. A
/// failed reconnect is returned as well. Errors of any other kind are
/// never retried.
///
/// The current connection sits behind an `RwLock<Arc<_>>`: the lock is
/// held only long enough to clone or replace the pointer, so slow
/// directory calls never block each other on it.
pub struct ResilientDirectory<C: DirectoryConnector> {
    connector: C,
    conn: RwLock<Arc<C::Connection>>,
}

impl<C: DirectoryConnector> ResilientDirectory<C> {
    /// Opens the initial connection. Fails if the directory is unreachable.
    pub async fn connect(connector: C) -> Result<Self, DirectoryError> {
        let conn = connector.connect().await?;
        Ok(Self {
            connector,
            conn: RwLock::new(Arc::new(conn)),
        })
    }

    async fn current(&self) -> Arc<C::Connection> {
        Arc::clone(&*self.conn.read().await)
    }

    async fn reconnect(&self) -> Result<Arc<C::Connection>, DirectoryError> {
        let fresh = Arc::new(self.connector.connect().await?);
        *self.conn.write().await = Arc::clone(&fresh);
        tracing::info!("directory connection re-established");
        Ok(fresh)
    }
}

impl<C: DirectoryConnector> Directory for ResilientDirectory<C> {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<Entry>, DirectoryError> {
        let conn = self.current().await;
        match conn.search(req).await {
            Err(e) if e.is_network() => {
                tracing::warn!(error = %e, "directory search failed, reconnecting");
                self.reconnect().await?.search(req).await
            }
            other => other,
        }
    }

    async fn modify(&self, req: &ModifyRequest) -> Result<(), DirectoryError> {
        let conn = self.current().await;
        match conn.modify(req).await {
            Err(e) if e.is_network() => {
                tracing::warn!(error = %e, dn = %req.dn, "directory modify failed, reconnecting");
                self.reconnect().await?.modify(req).await
            }
            other => other,
        }
    }
}
