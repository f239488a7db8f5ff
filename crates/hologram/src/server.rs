//! `HologramServer` builder and server loop.
//!
//! This is the entry point for running a Hologram server. It ties
//! together all the layers: transport → protocol → handler → user cache
//! and credential issuance. Besides the accept loop it owns the
//! background tasks that keep the user cache fresh.

use std::sync::Arc;
use std::time::Duration;

use hologram_credentials::CredentialService;
use hologram_directory::{Directory, DirectorySchema};
use hologram_transport::{TcpTransport, Transport};
use hologram_users::{NoopStats, Stats, UserCache};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

use crate::HologramError;
use crate::handler::handle_connection;
use crate::logging::LogLevelHandle;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Configuration for a server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: String,

    /// Where `AddSshKey` looks users up, and which attributes it
    /// reads and writes.
    pub schema: DirectorySchema,

    /// Enforce group role grants on `AssumeRole` and `GetUserCredentials`.
    pub enable_directory_roles: bool,

    /// Seconds between periodic user cache refreshes. 0 disables the
    /// timer; SIGHUP still forces a refresh.
    pub cache_refresh_interval_secs: u64,

    /// Maximum number of challenges issued for one request before the
    /// server gives up. `None` lets the client try keys indefinitely.
    pub max_challenge_attempts: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3100".to_string(),
            schema: DirectorySchema::default(),
            enable_directory_roles: false,
            cache_refresh_interval_secs: 3600,
            max_challenge_attempts: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerState
// ---------------------------------------------------------------------------

/// Everything a connection task needs, shared by all of them.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Every
/// collaborator synchronizes internally, so no lock lives here.
pub(crate) struct ServerState<U, K, D> {
    pub(crate) users: U,
    pub(crate) credentials: K,
    pub(crate) directory: D,
    pub(crate) stats: Arc<dyn Stats>,
    pub(crate) config: ServerConfig,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Hologram server.
///
/// # Example
///
/// ```rust,ignore
/// use hologram::prelude::*;
///
/// let server = HologramServer::builder()
///     .bind("0.0.0.0:3100")
///     .stats(Arc::new(TracingStats))
///     .build(user_cache, credential_service, directory)
///     .await?;
/// server.run().await
/// ```
pub struct HologramServerBuilder {
    config: ServerConfig,
    stats: Arc<dyn Stats>,
    log_handle: Option<LogLevelHandle>,
}

impl HologramServerBuilder {
    /// Default configuration, no stats, no log toggle.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            stats: Arc::new(NoopStats),
            log_handle: None,
        }
    }

    /// Overrides `bind_addr`.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the stats sink. Defaults to [`NoopStats`].
    pub fn stats(mut self, stats: Arc<dyn Stats>) -> Self {
        self.stats = stats;
        self
    }

    /// Enables the SIGUSR1 / SIGUSR2 debug logging toggle.
    pub fn log_handle(mut self, handle: LogLevelHandle) -> Self {
        self.log_handle = Some(handle);
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// `users` should already be loaded; `directory` is used for
    /// `AddSshKey` and is usually the same directory the cache reads.
    pub async fn build<U, K, D>(
        self,
        users: U,
        credentials: K,
        directory: D,
    ) -> Result<HologramServer<U, K, D>, HologramError>
    where
        U: UserCache,
        K: CredentialService,
        D: Directory,
    {
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            users,
            credentials,
            directory,
            stats: self.stats,
            config: self.config,
        });

        Ok(HologramServer {
            transport,
            state,
            log_handle: self.log_handle,
        })
    }
}

impl Default for HologramServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A Hologram server bound to its listener.
///
/// Nothing is accepted until [`run()`](Self::run) is awaited.
pub struct HologramServer<U, K, D> {
    transport: TcpTransport,
    state: Arc<ServerState<U, K, D>>,
    log_handle: Option<LogLevelHandle>,
}

impl<U, K, D> HologramServer<U, K, D>
where
    U: UserCache,
    K: CredentialService,
    D: Directory,
{
    /// Shorthand for [`HologramServerBuilder::new`].
    pub fn builder() -> HologramServerBuilder {
        HologramServerBuilder::new()
    }

    /// The address actually bound; useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server until SIGINT or SIGTERM.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Alongside the accept loop it refreshes the user cache on a timer
    /// and on SIGHUP, and toggles debug logging on SIGUSR1 / SIGUSR2 when
    /// a [`LogLevelHandle`] was supplied.
    pub async fn run(mut self) -> Result<(), HologramError> {
        let mut background = vec![
            spawn_periodic_refresh(Arc::clone(&self.state)),
            spawn_reload_on_hangup(Arc::clone(&self.state))?,
        ];
        if let Some(handle) = self.log_handle.take() {
            background.push(spawn_debug_toggle(handle)?);
        }

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        tracing::info!(addr = %self.state.config.bind_addr, "Hologram server is online");

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!("caught signal, shutting down");
                    break;
                }
            }
        }

        for task in background {
            task.abort();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn refresh_users<U: UserCache, K, D>(state: &ServerState<U, K, D>, reason: &'static str) {
    tracing::info!(reason, "refreshing user cache");
    if let Err(e) = state.users.refresh().await {
        tracing::error!(reason, error = %e, "user cache refresh failed");
    }
}

/// Refreshes the cache every `cache_refresh_interval_secs`.
fn spawn_periodic_refresh<U, K, D>(state: Arc<ServerState<U, K, D>>) -> JoinHandle<()>
where
    U: UserCache,
    K: CredentialService,
    D: Directory,
{
    tokio::spawn(async move {
        let secs = state.config.cache_refresh_interval_secs;
        if secs == 0 {
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        // The first tick completes immediately; the cache was just loaded.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            refresh_users(&state, "timer").await;
        }
    })
}

/// SIGHUP forces a cache reload.
fn spawn_reload_on_hangup<U, K, D>(
    state: Arc<ServerState<U, K, D>>,
) -> Result<JoinHandle<()>, HologramError>
where
    U: UserCache,
    K: CredentialService,
    D: Directory,
{
    let mut hangup = signal(SignalKind::hangup()).map_err(HologramError::Signal)?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            refresh_users(&state, "SIGHUP").await;
        }
    }))
}

/// SIGUSR1 enables debug logging, SIGUSR2 disables it.
fn spawn_debug_toggle(handle: LogLevelHandle) -> Result<JoinHandle<()>, HologramError> {
    let mut enable = signal(SignalKind::user_defined1()).map_err(HologramError::Signal)?;
    let mut disable = signal(SignalKind::user_defined2()).map_err(HologramError::Signal)?;
    Ok(tokio::spawn(async move {
        loop {
            let enabled = tokio::select! {
                Some(()) = enable.recv() => true,
                Some(()) = disable.recv() => false,
                else => break,
            };
            tracing::info!(debug = enabled, "toggling debug logging");
            if let Err(e) = handle.set_debug(enabled) {
                tracing::error!(error = %e, "could not change log level");
            }
        }
    }))
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
